use crate::core::distance::haversine_distance;
use crate::core::Result;
use crate::models::{CompatibilityFeatures, MessageRecord, ProfileRecord, TraitScores};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Reply gaps at or above this are not counted as responses.
pub const MAX_REPLY_GAP_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Read access to the external profile/interaction store.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch a profile by id. `CompatibilityError::ProfileNotFound` when the
    /// id does not resolve.
    async fn get_profile(&self, user_id: &str) -> Result<ProfileRecord>;

    /// Count directional "like" interactions from one user to another.
    async fn count_likes(&self, from: &str, to: &str) -> Result<u32>;

    /// Count comments attributable to any of the given users.
    async fn count_comments(&self, user_ids: &[&str]) -> Result<u32>;

    /// Messages sent by either user, ordered by send time ascending.
    async fn messages_between(&self, user_a: &str, user_b: &str)
        -> Result<Vec<MessageRecord>>;
}

/// External personality-compatibility subroutine. Not redesigned here; the
/// extractor only clamps its sub-scores.
#[async_trait]
pub trait PersonalityScorer: Send + Sync {
    async fn trait_compatibility(&self, user_a: &str, user_b: &str) -> Result<TraitScores>;
}

/// Builds a `CompatibilityFeatures` vector for an ordered pair of user ids.
///
/// Read-only; issues several store queries per call with no transactional
/// guarantee across them. The result is a best-effort snapshot.
pub struct FeatureExtractor {
    store: Arc<dyn ProfileStore>,
    personality: Arc<dyn PersonalityScorer>,
}

impl FeatureExtractor {
    pub fn new(store: Arc<dyn ProfileStore>, personality: Arc<dyn PersonalityScorer>) -> Self {
        Self { store, personality }
    }

    /// Extract the feature vector for a user pair.
    ///
    /// Fails with `ProfileNotFound` if either id does not resolve to a
    /// profile. Missing coordinates are treated as (0,0) and a missing age
    /// as 0 - documented approximations, not precision guarantees.
    pub async fn extract(&self, user_a: &str, user_b: &str) -> Result<CompatibilityFeatures> {
        let profile_a = self.store.get_profile(user_a).await?;
        let profile_b = self.store.get_profile(user_b).await?;

        let likes_given = self.store.count_likes(user_a, user_b).await?;
        let likes_received = self.store.count_likes(user_b, user_a).await?;
        let comments_count = self.store.count_comments(&[user_a, user_b]).await?;
        let messages = self.store.messages_between(user_a, user_b).await?;
        let traits = self
            .personality
            .trait_compatibility(user_a, user_b)
            .await?
            .clamped();

        let proximity_km = haversine_distance(
            profile_a.latitude.unwrap_or(0.0),
            profile_a.longitude.unwrap_or(0.0),
            profile_b.latitude.unwrap_or(0.0),
            profile_b.longitude.unwrap_or(0.0),
        );

        let shared_interests_count = shared_interests(&profile_a, &profile_b);
        let age_gap = profile_a
            .age
            .unwrap_or(0)
            .abs_diff(profile_b.age.unwrap_or(0));
        let response_time_ms = average_response_time_ms(&messages);

        tracing::debug!(
            "Extracted features for {}-{}: {} shared interests, {:.1}km apart",
            user_a,
            user_b,
            shared_interests_count,
            proximity_km
        );

        Ok(CompatibilityFeatures {
            likes_given,
            likes_received,
            comments_count,
            proximity_km,
            response_time_ms,
            shared_interests_count,
            age_gap,
            big_five_compatibility: traits.big_five,
            swinger_traits_score: traits.swinger,
        })
    }
}

/// Size of the intersection of the two profiles' declared interest tags.
fn shared_interests(a: &ProfileRecord, b: &ProfileRecord) -> u32 {
    let tags_a: HashSet<&str> = a.interests.iter().map(String::as_str).collect();
    let tags_b: HashSet<&str> = b.interests.iter().map(String::as_str).collect();
    tags_a.intersection(&tags_b).count() as u32
}

/// Average reply latency across the pair's shared threads.
///
/// A reply is a message whose sender differs from the previous message in
/// the same thread; gaps of 7 days or more are excluded as "not a response".
/// Returns 0 when fewer than two qualifying messages exist.
fn average_response_time_ms(messages: &[MessageRecord]) -> f64 {
    if messages.len() < 2 {
        return 0.0;
    }

    let mut gaps: Vec<f64> = Vec::new();
    let mut last_in_thread: HashMap<&str, &MessageRecord> = HashMap::new();

    for message in messages {
        if let Some(previous) = last_in_thread.get(message.conversation_id.as_str()) {
            if previous.sender_id != message.sender_id {
                let gap_ms = (message.sent_at - previous.sent_at).num_milliseconds();
                if (0..MAX_REPLY_GAP_MS).contains(&gap_ms) {
                    gaps.push(gap_ms as f64);
                }
            }
        }
        last_in_thread.insert(message.conversation_id.as_str(), message);
    }

    if gaps.is_empty() {
        0.0
    } else {
        gaps.iter().sum::<f64>() / gaps.len() as f64
    }
}
