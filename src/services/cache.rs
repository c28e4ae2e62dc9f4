use crate::models::AiScore;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

/// One cached prediction with its expiry instant. Entries are never updated
/// in place; a fresh prediction overwrites the slot.
struct CacheEntry {
    score: AiScore,
    expires_at: Instant,
}

/// In-memory TTL cache for compatibility scores
///
/// Keys are symmetric over the user pair, so `u1-u2` and `u2-u1` share one
/// slot. Expiry is lazy: a stale entry is evicted by the read that observes
/// it, there is no background sweep. Unbounded - a documented limitation of
/// the reference behavior, not a design goal.
pub struct ScoreCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ScoreCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Order-independent cache key for a user pair.
    ///
    /// Ids are joined with `:` without escaping; pairs like `("a:b", "c")`
    /// and `("a", "b:c")` would collide. User ids are UUIDs, which never
    /// contain the separator.
    pub fn key(user_a: &str, user_b: &str) -> String {
        if user_a <= user_b {
            format!("{}:{}", user_a, user_b)
        } else {
            format!("{}:{}", user_b, user_a)
        }
    }

    /// Get a cached score if present and unexpired.
    pub async fn get(&self, key: &str) -> Option<AiScore> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if Instant::now() < entry.expires_at => {
                    tracing::trace!("Score cache hit: {}", key);
                    return Some(entry.score.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Entry exists but is stale: evict it on this read
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            if Instant::now() < entry.expires_at {
                return Some(entry.score.clone());
            }
            entries.remove(key);
            tracing::trace!("Evicted expired score cache entry: {}", key);
        }
        None
    }

    /// Cache a score for `ttl`. Unconditionally overwrites any existing entry.
    pub async fn put(&self, key: &str, score: AiScore, ttl: Duration) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                score,
                expires_at: Instant::now() + ttl,
            },
        );
        tracing::trace!("Score cache set: {}", key);
    }

    /// Empty the cache (used for test isolation).
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of entries, stale ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for ScoreCache {
    fn default() -> Self {
        Self::new()
    }
}
