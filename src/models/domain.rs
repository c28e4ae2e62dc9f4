use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Behavioral and profile signals for a user pair.
///
/// Produced by the feature extractor, consumed by the scoring model.
/// All counts are non-negative; the two trait sub-scores are clamped
/// to [0,1] by their producers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityFeatures {
    #[serde(rename = "likesGiven")]
    pub likes_given: u32,
    #[serde(rename = "likesReceived")]
    pub likes_received: u32,
    #[serde(rename = "commentsCount")]
    pub comments_count: u32,
    #[serde(rename = "proximityKm")]
    pub proximity_km: f64,
    #[serde(rename = "responseTimeMs")]
    pub response_time_ms: f64,
    #[serde(rename = "sharedInterestsCount")]
    pub shared_interests_count: u32,
    #[serde(rename = "ageGap")]
    pub age_gap: u32,
    #[serde(rename = "bigFiveCompatibility")]
    pub big_five_compatibility: f64,
    #[serde(rename = "swingerTraitsScore")]
    pub swinger_traits_score: f64,
}

/// How a compatibility score was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMethod {
    Ai,
    Legacy,
    Hybrid,
}

impl ScoreMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreMethod::Ai => "ai",
            ScoreMethod::Legacy => "legacy",
            ScoreMethod::Hybrid => "hybrid",
        }
    }
}

/// Outcome of one compatibility prediction. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiScore {
    pub score: f64,
    pub confidence: f64,
    pub method: ScoreMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<CompatibilityFeatures>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Profile fields the feature extractor reads from the external store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub interests: Vec<String>,
}

/// One message row from a conversation thread, ordered by `sent_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    #[serde(rename = "senderId")]
    pub sender_id: String,
    #[serde(rename = "conversationId")]
    pub conversation_id: String,
    #[serde(rename = "sentAt")]
    pub sent_at: DateTime<Utc>,
}

/// Personality sub-scores from the external compatibility subroutine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TraitScores {
    #[serde(rename = "bigFive")]
    pub big_five: f64,
    pub swinger: f64,
}

impl TraitScores {
    /// Clamp both sub-scores to [0,1].
    pub fn clamped(self) -> Self {
        Self {
            big_five: self.big_five.clamp(0.0, 1.0),
            swinger: self.swinger.clamp(0.0, 1.0),
        }
    }
}

/// Static scoring-model configuration. Set once at construction.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Filesystem path of the serialized ONNX artifact.
    pub path: String,
    /// Number of model inputs (the swinger sub-score is excluded).
    pub input_size: usize,
    pub version: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "models/compatibility.onnx".to_string(),
            input_size: 8,
            version: "v1".to_string(),
        }
    }
}

/// Pair-keyed score row written to the analysis store on ai/hybrid success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityScoreRecord {
    #[serde(rename = "userA")]
    pub user_a: String,
    #[serde(rename = "userB")]
    pub user_b: String,
    #[serde(rename = "aiScore")]
    pub ai_score: f64,
    #[serde(rename = "legacyScore")]
    pub legacy_score: Option<f64>,
    #[serde(rename = "finalScore")]
    pub final_score: f64,
    pub method: ScoreMethod,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Prediction-log row for offline analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionLogRecord {
    #[serde(rename = "pairKey")]
    pub pair_key: String,
    pub score: f64,
    pub confidence: f64,
    pub method: ScoreMethod,
    #[serde(rename = "latencyMs")]
    pub latency_ms: u64,
    #[serde(rename = "cacheHit")]
    pub cache_hit: bool,
    #[serde(rename = "fallbackUsed")]
    pub fallback_used: bool,
    #[serde(rename = "modelVersion")]
    pub model_version: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_method_serde() {
        let json = serde_json::to_string(&ScoreMethod::Hybrid).unwrap();
        assert_eq!(json, "\"hybrid\"");

        let parsed: ScoreMethod = serde_json::from_str("\"legacy\"").unwrap();
        assert_eq!(parsed, ScoreMethod::Legacy);
    }

    #[test]
    fn test_trait_scores_clamped() {
        let scores = TraitScores {
            big_five: 1.7,
            swinger: -0.3,
        }
        .clamped();

        assert_eq!(scores.big_five, 1.0);
        assert_eq!(scores.swinger, 0.0);
    }

    #[test]
    fn test_features_wire_names() {
        let features = CompatibilityFeatures {
            likes_given: 3,
            likes_received: 1,
            comments_count: 4,
            proximity_km: 2.5,
            response_time_ms: 5000.0,
            shared_interests_count: 2,
            age_gap: 4,
            big_five_compatibility: 0.8,
            swinger_traits_score: 0.6,
        };

        let json = serde_json::to_value(&features).unwrap();
        assert_eq!(json["likesGiven"], 3);
        assert_eq!(json["sharedInterestsCount"], 2);
        assert_eq!(json["bigFiveCompatibility"], 0.8);
    }
}
