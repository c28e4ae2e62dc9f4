use crate::core::scoring::{model_fallback_score, NormalizedFeatures};
use crate::core::{CompatibilityError, Result};
use crate::models::{CompatibilityFeatures, ModelConfig};
use std::path::Path;
use tract_onnx::prelude::{tract_ndarray, tvec, Framework, InferenceModelExt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

type OnnxPlan = tract_onnx::prelude::SimplePlan<
    tract_onnx::prelude::TypedFact,
    Box<dyn tract_onnx::prelude::TypedOp>,
    tract_onnx::prelude::Graph<
        tract_onnx::prelude::TypedFact,
        Box<dyn tract_onnx::prelude::TypedOp>,
    >,
>;

/// Load state of the ONNX artifact.
///
/// There is no explicit `Loading` variant: an in-flight load holds the state
/// mutex, so concurrent callers wait on the same load instead of starting a
/// second one. `Failed` is terminal for the instance - later predictions use
/// the fallback formula without retrying.
enum ModelState {
    Unloaded,
    Loaded(Arc<OnnxPlan>),
    Failed,
}

/// ONNX-backed compatibility scoring model
///
/// Maps a normalized 8-feature vector to a score in [0,1]. Any load or
/// inference failure silently substitutes the deterministic fallback formula;
/// `predict` never errors under normal operation.
pub struct ScoringModel {
    config: ModelConfig,
    state: Mutex<ModelState>,
}

impl ScoringModel {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            state: Mutex::new(ModelState::Unloaded),
        }
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    /// Load the ONNX artifact. Idempotent: an already-loaded model returns
    /// immediately and a failed load is not retried.
    pub async fn load(&self) -> Result<()> {
        self.ensure_loaded().await.map(|_| ())
    }

    /// Predict a compatibility score in [0,1] for the given features.
    ///
    /// Never errors: load or inference failures fall back to the weighted
    /// formula in `core::scoring`.
    pub async fn predict(&self, features: &CompatibilityFeatures) -> f64 {
        let normalized = NormalizedFeatures::from(features);

        let plan = match self.ensure_loaded().await {
            Ok(plan) => plan,
            Err(e) => {
                debug!("Scoring model unavailable ({}), using fallback formula", e);
                return model_fallback_score(&normalized);
            }
        };

        match self.run_inference(&plan, normalized) {
            Ok(score) => score,
            Err(e) => {
                warn!("Model inference failed ({}), using fallback formula", e);
                model_fallback_score(&normalized)
            }
        }
    }

    /// Run one dummy prediction to force loading and graph initialization
    /// ahead of real traffic.
    pub async fn warmup(&self) {
        let dummy = CompatibilityFeatures {
            likes_given: 0,
            likes_received: 0,
            comments_count: 0,
            proximity_km: 0.0,
            response_time_ms: 0.0,
            shared_interests_count: 0,
            age_gap: 0,
            big_five_compatibility: 0.0,
            swinger_traits_score: 0.0,
        };

        let score = self.predict(&dummy).await;
        debug!("Model warmup complete (dummy score {:.3})", score);
    }

    /// Release the loaded model and return to `Unloaded`. Safe to call
    /// multiple times; a later `predict` will attempt a fresh load.
    pub async fn dispose(&self) {
        let mut state = self.state.lock().await;
        *state = ModelState::Unloaded;
        debug!("Scoring model disposed");
    }

    /// Return the loaded plan, loading it first if this is the first call.
    async fn ensure_loaded(&self) -> Result<Arc<OnnxPlan>> {
        let mut state = self.state.lock().await;

        match &*state {
            ModelState::Loaded(plan) => return Ok(Arc::clone(plan)),
            ModelState::Failed => {
                return Err(CompatibilityError::ModelLoad(format!(
                    "previous load of {} failed",
                    self.config.path
                )))
            }
            ModelState::Unloaded => {}
        }

        let path = self.config.path.clone();
        let loaded = match tokio::task::spawn_blocking(move || Self::try_load_onnx(Path::new(&path)))
            .await
        {
            Ok(loaded) => loaded,
            Err(e) => {
                // A panicked load task is as terminal as a failed one.
                *state = ModelState::Failed;
                return Err(CompatibilityError::ModelLoad(format!(
                    "load task panicked: {}",
                    e
                )));
            }
        };

        match loaded {
            Ok(plan) => {
                let plan = Arc::new(plan);
                debug!(
                    "Loaded ONNX compatibility model {} from {}",
                    self.config.version, self.config.path
                );
                *state = ModelState::Loaded(Arc::clone(&plan));
                Ok(plan)
            }
            Err(e) => {
                warn!(
                    "Failed to load ONNX model from {}: {}",
                    self.config.path, e
                );
                *state = ModelState::Failed;
                Err(CompatibilityError::ModelLoad(e))
            }
        }
    }

    /// Forward pass over the loaded plan. Tensor buffers are scoped to this
    /// call and freed on every path.
    fn run_inference(&self, plan: &OnnxPlan, normalized: NormalizedFeatures) -> Result<f64> {
        let values = normalized.to_model_input();

        if values.len() != self.config.input_size {
            return Err(CompatibilityError::InvalidInput(format!(
                "Expected {} features, got {}",
                self.config.input_size,
                values.len()
            )));
        }

        let input_tensor =
            tract_ndarray::Array2::from_shape_vec((1, values.len()), values.to_vec())
                .map_err(|e| CompatibilityError::Inference(format!("input shape error: {}", e)))?;

        let input = tvec![tract_onnx::prelude::Tensor::from(input_tensor.into_dyn()).into()];
        let output = plan
            .run(input)
            .map_err(|e| CompatibilityError::Inference(format!("ONNX inference failed: {}", e)))?;

        let scores = output[0]
            .to_array_view::<f32>()
            .map_err(|e| CompatibilityError::Inference(format!("Output extraction failed: {}", e)))?;

        let raw = scores
            .iter()
            .next()
            .copied()
            .ok_or_else(|| CompatibilityError::Inference("Empty model output".to_string()))?;

        Ok((raw as f64).clamp(0.0, 1.0))
    }

    fn try_load_onnx(path: &Path) -> std::result::Result<OnnxPlan, String> {
        if !path.exists() {
            return Err(format!("Model file not found: {}", path.display()));
        }

        tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| e.to_string())
    }
}
