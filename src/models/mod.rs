// Model exports
pub mod domain;

pub use domain::{
    AiScore, CompatibilityFeatures, CompatibilityScoreRecord, MessageRecord, ModelConfig,
    PredictionLogRecord, ProfileRecord, ScoreMethod, TraitScores,
};
