use crate::config::PredictorSettings;
use crate::core::features::{FeatureExtractor, PersonalityScorer, ProfileStore};
use crate::core::model::ScoringModel;
use crate::core::scoring::heuristic_score;
use crate::core::Result;
use crate::models::{
    AiScore, CompatibilityFeatures, CompatibilityScoreRecord, PredictionLogRecord, ScoreMethod,
};
use crate::services::cache::ScoreCache;
use async_trait::async_trait;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::Duration;
use tracing::{debug, warn};

/// Hybrid blend: 70% model score, 30% legacy heuristic.
pub const HYBRID_AI_WEIGHT: f64 = 0.7;
pub const HYBRID_LEGACY_WEIGHT: f64 = 0.3;

/// Append-only sinks for prediction records. Write failures are swallowed by
/// the predictor (warn-logged), so implementations do not need to retry.
#[async_trait]
pub trait PredictionSink: Send + Sync {
    async fn record_score(&self, record: &CompatibilityScoreRecord) -> Result<()>;
    async fn record_prediction(&self, record: &PredictionLogRecord) -> Result<()>;
}

/// Compatibility-scoring orchestrator
///
/// Single entry point composing feature extraction, model scoring, caching
/// and prediction logging behind a graceful-degradation ladder:
/// cache -> AI/hybrid -> legacy -> propagate.
///
/// Constructed once at application startup and shared by reference; there is
/// no hidden global state.
pub struct CompatibilityPredictor {
    settings: PredictorSettings,
    extractor: FeatureExtractor,
    model: Option<Arc<ScoringModel>>,
    cache: ScoreCache,
    sink: Arc<dyn PredictionSink>,
}

impl CompatibilityPredictor {
    pub fn new(
        settings: PredictorSettings,
        store: Arc<dyn ProfileStore>,
        personality: Arc<dyn PersonalityScorer>,
        model: Option<Arc<ScoringModel>>,
        sink: Arc<dyn PredictionSink>,
    ) -> Self {
        Self {
            settings,
            extractor: FeatureExtractor::new(store, personality),
            model,
            cache: ScoreCache::new(),
            sink,
        }
    }

    /// The owned score cache, exposed for priming and test isolation.
    pub fn cache(&self) -> &ScoreCache {
        &self.cache
    }

    /// Force model loading ahead of real traffic. No-op without a model.
    pub async fn warmup(&self) {
        if let Some(model) = &self.model {
            model.warmup().await;
        }
    }

    /// Predict the compatibility score for a user pair.
    ///
    /// `legacy_score` is the caller-supplied pre-ML heuristic, invoked only
    /// when a legacy or hybrid score is needed. It is the last resort of the
    /// degradation ladder and is assumed infallible; an error inside it has
    /// no further fallback and will propagate as a panic.
    ///
    /// With `fallback_enabled` (the default) this call only errors when the
    /// legacy callback itself misbehaves; every AI-side failure degrades to
    /// the legacy score.
    pub async fn predict_compatibility<F, Fut>(
        &self,
        user_a: &str,
        user_b: &str,
        legacy_score: F,
    ) -> Result<AiScore>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = f64>,
    {
        let key = ScoreCache::key(user_a, user_b);

        if self.settings.cache_enabled {
            if let Some(hit) = self.cache.get(&key).await {
                debug!("Compatibility cache hit for {}", key);
                return Ok(hit);
            }
        }

        // AI disabled: wrap the legacy score without touching the extractor
        // or model at all. Cost avoidance is the point of the flag.
        if !self.settings.ai_enabled {
            let score = legacy_score().await;
            let result = AiScore {
                score,
                confidence: 1.0,
                method: ScoreMethod::Legacy,
                features: None,
                created_at: Utc::now(),
            };
            self.cache_result(&key, &result).await;
            return Ok(result);
        }

        let started = Instant::now();

        match self.score_with_ai(user_a, user_b).await {
            Ok((ai_score, features)) => {
                let (result, legacy) = if self.settings.fallback_enabled {
                    let legacy = legacy_score().await;
                    let hybrid = ai_score * HYBRID_AI_WEIGHT + legacy * HYBRID_LEGACY_WEIGHT;
                    (
                        AiScore {
                            score: hybrid,
                            confidence: 0.85,
                            method: ScoreMethod::Hybrid,
                            features: Some(features),
                            created_at: Utc::now(),
                        },
                        Some(legacy),
                    )
                } else {
                    (
                        AiScore {
                            score: ai_score,
                            confidence: 0.9,
                            method: ScoreMethod::Ai,
                            features: Some(features),
                            created_at: Utc::now(),
                        },
                        None,
                    )
                };

                self.cache_result(&key, &result).await;
                self.log_prediction(user_a, user_b, &key, ai_score, legacy, &result, started);
                Ok(result)
            }
            Err(e) if self.settings.fallback_enabled => {
                warn!(
                    "AI scoring failed for {} ({}), degrading to legacy score",
                    key, e
                );
                let score = legacy_score().await;
                let result = AiScore {
                    score,
                    confidence: 1.0,
                    method: ScoreMethod::Legacy,
                    features: None,
                    created_at: Utc::now(),
                };
                // Cached, but deliberately not written to the analysis sinks.
                self.cache_result(&key, &result).await;
                Ok(result)
            }
            Err(e) => Err(e),
        }
    }

    /// Extract features and score them: model if one is configured,
    /// otherwise the predictor-level heuristic formula.
    async fn score_with_ai(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<(f64, CompatibilityFeatures)> {
        let features = self.extractor.extract(user_a, user_b).await?;

        let score = match &self.model {
            Some(model) => model.predict(&features).await,
            None => heuristic_score(&features),
        };

        Ok((score.clamp(0.0, 1.0), features))
    }

    async fn cache_result(&self, key: &str, result: &AiScore) {
        if self.settings.cache_enabled {
            self.cache
                .put(
                    key,
                    result.clone(),
                    Duration::from_secs(self.settings.cache_ttl_secs),
                )
                .await;
        }
    }

    /// Fire-and-forget write of the score and prediction-log records.
    /// Sink failures never affect the returned score.
    #[allow(clippy::too_many_arguments)]
    fn log_prediction(
        &self,
        user_a: &str,
        user_b: &str,
        key: &str,
        ai_score: f64,
        legacy_score: Option<f64>,
        result: &AiScore,
        started: Instant,
    ) {
        let sink = Arc::clone(&self.sink);

        let score_record = CompatibilityScoreRecord {
            user_a: user_a.to_string(),
            user_b: user_b.to_string(),
            ai_score,
            legacy_score,
            final_score: result.score,
            method: result.method,
            created_at: result.created_at,
        };

        let log_record = PredictionLogRecord {
            pair_key: key.to_string(),
            score: result.score,
            confidence: result.confidence,
            method: result.method,
            latency_ms: started.elapsed().as_millis() as u64,
            cache_hit: false,
            fallback_used: result.method == ScoreMethod::Hybrid,
            model_version: self.model.as_ref().map(|m| m.version().to_string()),
            created_at: result.created_at,
        };

        tokio::spawn(async move {
            if let Err(e) = sink.record_score(&score_record).await {
                warn!("Failed to record compatibility score: {}", e);
            }
            if let Err(e) = sink.record_prediction(&log_record).await {
                warn!("Failed to record prediction log: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CompatibilityError;
    use crate::models::{MessageRecord, ProfileRecord, TraitScores};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    struct MockStore {
        profile_calls: AtomicUsize,
        fail: bool,
    }

    impl MockStore {
        fn new() -> Self {
            Self {
                profile_calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                profile_calls: AtomicUsize::new(0),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl ProfileStore for MockStore {
        async fn get_profile(&self, user_id: &str) -> Result<ProfileRecord> {
            self.profile_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CompatibilityError::ProfileNotFound(user_id.to_string()));
            }
            Ok(ProfileRecord {
                id: user_id.to_string(),
                age: Some(30),
                latitude: Some(19.4326),
                longitude: Some(-99.1332),
                interests: vec!["salsa".into(), "hiking".into()],
            })
        }

        async fn count_likes(&self, _from: &str, _to: &str) -> Result<u32> {
            Ok(2)
        }

        async fn count_comments(&self, _user_ids: &[&str]) -> Result<u32> {
            Ok(4)
        }

        async fn messages_between(&self, _a: &str, _b: &str) -> Result<Vec<MessageRecord>> {
            Ok(vec![])
        }
    }

    struct MockPersonality;

    #[async_trait]
    impl PersonalityScorer for MockPersonality {
        async fn trait_compatibility(&self, _a: &str, _b: &str) -> Result<TraitScores> {
            Ok(TraitScores {
                big_five: 0.8,
                swinger: 0.6,
            })
        }
    }

    #[derive(Default)]
    struct MockSink {
        scores: Mutex<Vec<CompatibilityScoreRecord>>,
        logs: Mutex<Vec<PredictionLogRecord>>,
    }

    #[async_trait]
    impl PredictionSink for MockSink {
        async fn record_score(&self, record: &CompatibilityScoreRecord) -> Result<()> {
            self.scores.lock().await.push(record.clone());
            Ok(())
        }

        async fn record_prediction(&self, record: &PredictionLogRecord) -> Result<()> {
            self.logs.lock().await.push(record.clone());
            Ok(())
        }
    }

    /// Features matching what `MockStore` + `MockPersonality` produce for a
    /// pair of identical profiles.
    fn expected_features() -> CompatibilityFeatures {
        CompatibilityFeatures {
            likes_given: 2,
            likes_received: 2,
            comments_count: 4,
            proximity_km: 0.0,
            response_time_ms: 0.0,
            shared_interests_count: 2,
            age_gap: 0,
            big_five_compatibility: 0.8,
            swinger_traits_score: 0.6,
        }
    }

    fn predictor(
        settings: PredictorSettings,
        store: Arc<MockStore>,
        sink: Arc<MockSink>,
    ) -> CompatibilityPredictor {
        CompatibilityPredictor::new(settings, store, Arc::new(MockPersonality), None, sink)
    }

    fn ai_settings(fallback: bool) -> PredictorSettings {
        PredictorSettings {
            ai_enabled: true,
            fallback_enabled: fallback,
            cache_enabled: true,
            cache_ttl_secs: 3600,
        }
    }

    #[tokio::test]
    async fn test_hybrid_blend_formula() {
        let store = Arc::new(MockStore::new());
        let service = predictor(ai_settings(true), Arc::clone(&store), Arc::default());

        let result = service
            .predict_compatibility("u1", "u2", || async { 0.5 })
            .await
            .unwrap();

        let ai = heuristic_score(&expected_features());
        let expected = ai * 0.7 + 0.5 * 0.3;

        assert_eq!(result.method, ScoreMethod::Hybrid);
        assert_eq!(result.confidence, 0.85);
        assert!((result.score - expected).abs() < 1e-9);
        assert!(result.features.is_some());
    }

    #[tokio::test]
    async fn test_pure_ai_when_blend_disabled() {
        let store = Arc::new(MockStore::new());
        let service = predictor(ai_settings(false), Arc::clone(&store), Arc::default());

        let result = service
            .predict_compatibility("u1", "u2", || async {
                panic!("legacy scorer must not run on the pure AI path")
            })
            .await
            .unwrap();

        assert_eq!(result.method, ScoreMethod::Ai);
        assert_eq!(result.confidence, 0.9);
        assert!((result.score - heuristic_score(&expected_features())).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_degrades_to_legacy_on_extraction_failure() {
        let store = Arc::new(MockStore::failing());
        let sink = Arc::new(MockSink::default());
        let service = predictor(ai_settings(true), Arc::clone(&store), Arc::clone(&sink));

        let result = service
            .predict_compatibility("u1", "u2", || async { 0.33 })
            .await
            .unwrap();

        assert_eq!(result.method, ScoreMethod::Legacy);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.score, 0.33);
        assert!(result.features.is_none());

        // The error path is cached but never written to the analysis sinks
        assert!(service.cache().get(&ScoreCache::key("u1", "u2")).await.is_some());
        tokio::task::yield_now().await;
        assert!(sink.scores.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_propagates_when_fallback_disabled() {
        let store = Arc::new(MockStore::failing());
        let service = predictor(ai_settings(false), Arc::clone(&store), Arc::default());

        let err = service
            .predict_compatibility("u1", "u2", || async { 0.33 })
            .await
            .unwrap_err();

        assert!(matches!(err, CompatibilityError::ProfileNotFound(_)));
    }

    #[tokio::test]
    async fn test_successful_prediction_reaches_both_sinks() {
        let store = Arc::new(MockStore::new());
        let sink = Arc::new(MockSink::default());
        let service = predictor(ai_settings(true), Arc::clone(&store), Arc::clone(&sink));

        let result = service
            .predict_compatibility("u1", "u2", || async { 0.5 })
            .await
            .unwrap();

        // Logging is fire-and-forget; give the spawned task a chance to run.
        for _ in 0..50 {
            if !sink.logs.lock().await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let scores = sink.scores.lock().await;
        let logs = sink.logs.lock().await;
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].user_a, "u1");
        assert_eq!(scores[0].legacy_score, Some(0.5));
        assert_eq!(scores[0].final_score, result.score);

        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].pair_key, "u1:u2");
        assert!(!logs[0].cache_hit);
        assert!(logs[0].fallback_used);
        assert_eq!(logs[0].model_version, None);
    }

    #[tokio::test]
    async fn test_second_call_served_from_cache() {
        let store = Arc::new(MockStore::new());
        let service = predictor(ai_settings(true), Arc::clone(&store), Arc::default());

        let first = service
            .predict_compatibility("u1", "u2", || async { 0.5 })
            .await
            .unwrap();
        let calls_after_first = store.profile_calls.load(Ordering::SeqCst);

        // Argument order must not matter for the cache key
        let second = service
            .predict_compatibility("u2", "u1", || async { 0.5 })
            .await
            .unwrap();

        assert_eq!(first.score, second.score);
        assert_eq!(store.profile_calls.load(Ordering::SeqCst), calls_after_first);
    }
}
