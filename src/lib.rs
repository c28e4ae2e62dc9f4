//! Conecta AI - compatibility-scoring core for the ComplicesConecta dating app
//!
//! This library provides the AI compatibility layer used by ComplicesConecta:
//! pair feature extraction, an ONNX scoring model with a deterministic
//! fallback, a TTL score cache, and an orchestrator that degrades gracefully
//! from cached scores through AI/hybrid scoring down to the caller-supplied
//! legacy heuristic.

pub mod config;
pub mod core;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    distance::haversine_distance, CompatibilityError, CompatibilityPredictor, FeatureExtractor,
    PersonalityScorer, PredictionSink, ProfileStore, ScoringModel,
};
pub use crate::models::{AiScore, CompatibilityFeatures, ModelConfig, ScoreMethod};
pub use crate::services::{ScoreCache, SupabaseClient};
