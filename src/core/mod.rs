// Core algorithm exports
pub mod distance;
pub mod features;
pub mod model;
pub mod predictor;
pub mod scoring;

pub use features::{FeatureExtractor, PersonalityScorer, ProfileStore};
pub use model::ScoringModel;
pub use predictor::{CompatibilityPredictor, PredictionSink};
pub use scoring::{heuristic_score, model_fallback_score, NormalizedFeatures};

use thiserror::Error;

/// Errors surfaced by the compatibility core.
///
/// Only `ProfileNotFound`/`Store` ever reach a caller of the predictor, and
/// only when fallback is disabled; everything else is absorbed by a
/// documented fallback tier.
#[derive(Debug, Error)]
pub enum CompatibilityError {
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Profile store error: {0}")]
    Store(String),

    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Model inference failed: {0}")]
    Inference(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Prediction sink error: {0}")]
    Sink(String),
}

pub type Result<T> = std::result::Result<T, CompatibilityError>;
