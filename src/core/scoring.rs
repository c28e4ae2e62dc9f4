use crate::models::CompatibilityFeatures;

/// Pair features normalized to [0,1] with fixed scaling constants.
///
/// The constants encode product assumptions and must not drift:
/// 10 likes ≈ saturation, 100 km ≈ irrelevant, a 1-minute reply ≈ instant,
/// a 20-year age gap ≈ irrelevant.
#[derive(Debug, Clone, Copy)]
pub struct NormalizedFeatures {
    pub likes_given: f64,
    pub likes_received: f64,
    pub comments: f64,
    pub proximity: f64,
    pub response_time: f64,
    pub shared_interests: f64,
    pub age_gap: f64,
    pub big_five: f64,
    pub swinger: f64,
}

impl From<&CompatibilityFeatures> for NormalizedFeatures {
    fn from(f: &CompatibilityFeatures) -> Self {
        Self {
            likes_given: (f.likes_given as f64 / 10.0).min(1.0),
            likes_received: (f.likes_received as f64 / 10.0).min(1.0),
            comments: (f.comments_count as f64 / 20.0).min(1.0),
            proximity: (1.0 - f.proximity_km / 100.0).max(0.0),
            response_time: (1.0 - f.response_time_ms / 60_000.0).max(0.0),
            shared_interests: (f.shared_interests_count as f64 / 10.0).min(1.0),
            age_gap: (1.0 - f.age_gap as f64 / 20.0).max(0.0),
            big_five: f.big_five_compatibility.clamp(0.0, 1.0),
            swinger: f.swinger_traits_score.clamp(0.0, 1.0),
        }
    }
}

impl NormalizedFeatures {
    /// Model input layout: 8 values, swinger traits deliberately excluded.
    pub fn to_model_input(self) -> [f32; 8] {
        [
            self.likes_given as f32,
            self.likes_received as f32,
            self.comments as f32,
            self.proximity as f32,
            self.response_time as f32,
            self.shared_interests as f32,
            self.age_gap as f32,
            self.big_five as f32,
        ]
    }
}

/// Model-internal fallback score (0-1)
///
/// Used when the ONNX artifact cannot be loaded or inference fails.
///
/// Scoring formula:
/// score = (
///     likes_given * 0.15 +
///     likes_received * 0.15 +
///     comments * 0.10 +
///     proximity * 0.15 +
///     response_time * 0.05 +
///     shared_interests * 0.20 +
///     age_gap * 0.10 +
///     big_five * 0.10
/// )
pub fn model_fallback_score(n: &NormalizedFeatures) -> f64 {
    let score = n.likes_given * 0.15
        + n.likes_received * 0.15
        + n.comments * 0.10
        + n.proximity * 0.15
        + n.response_time * 0.05
        + n.shared_interests * 0.20
        + n.age_gap * 0.10
        + n.big_five * 0.10;

    score.clamp(0.0, 1.0)
}

/// Predictor-level heuristic score (0-1)
///
/// Used when no scoring model is configured at all. A distinct formula from
/// `model_fallback_score`: the two like directions collapse into a single
/// 0.15-weighted term and the swinger sub-score contributes 0.10. The two
/// formulas are kept separate for behavioral parity with production.
pub fn heuristic_score(features: &CompatibilityFeatures) -> f64 {
    let n = NormalizedFeatures::from(features);
    let likes = ((features.likes_given + features.likes_received) as f64 / 10.0).min(1.0);

    let score = likes * 0.15
        + n.comments * 0.10
        + n.proximity * 0.15
        + n.response_time * 0.05
        + n.shared_interests * 0.20
        + n.age_gap * 0.10
        + n.big_five * 0.10
        + n.swinger * 0.10;

    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(likes: u32, km: f64, ms: f64, gap: u32) -> CompatibilityFeatures {
        CompatibilityFeatures {
            likes_given: likes,
            likes_received: likes,
            comments_count: 5,
            proximity_km: km,
            response_time_ms: ms,
            shared_interests_count: 3,
            age_gap: gap,
            big_five_compatibility: 0.8,
            swinger_traits_score: 0.6,
        }
    }

    #[test]
    fn test_normalization_constants() {
        let n = NormalizedFeatures::from(&features(5, 50.0, 30_000.0, 10));

        assert!((n.likes_given - 0.5).abs() < 1e-9);
        assert!((n.proximity - 0.5).abs() < 1e-9);
        assert!((n.response_time - 0.5).abs() < 1e-9);
        assert!((n.age_gap - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_normalization_saturates() {
        // 10 likes saturate, 100km+ is irrelevant, 1min+ replies score zero
        let n = NormalizedFeatures::from(&features(250, 4000.0, 3_600_000.0, 80));

        assert_eq!(n.likes_given, 1.0);
        assert_eq!(n.proximity, 0.0);
        assert_eq!(n.response_time, 0.0);
        assert_eq!(n.age_gap, 0.0);
    }

    #[test]
    fn test_fallback_weights_sum_to_one() {
        // All-saturated features must score exactly 1.0
        let best = CompatibilityFeatures {
            likes_given: 10,
            likes_received: 10,
            comments_count: 20,
            proximity_km: 0.0,
            response_time_ms: 0.0,
            shared_interests_count: 10,
            age_gap: 0,
            big_five_compatibility: 1.0,
            swinger_traits_score: 1.0,
        };

        let n = NormalizedFeatures::from(&best);
        assert!((model_fallback_score(&n) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_heuristic_differs_from_model_fallback() {
        // The swinger term only participates in the heuristic variant.
        let mut f = features(4, 10.0, 5_000.0, 3);
        let base_heuristic = heuristic_score(&f);

        f.swinger_traits_score = 0.0;
        let without_swinger = heuristic_score(&f);

        assert!((base_heuristic - without_swinger - 0.06).abs() < 1e-9);
    }

    #[test]
    fn test_scores_bounded_on_adversarial_input() {
        let hostile = CompatibilityFeatures {
            likes_given: u32::MAX,
            likes_received: u32::MAX,
            comments_count: u32::MAX,
            proximity_km: -500.0,
            response_time_ms: -1.0,
            shared_interests_count: u32::MAX,
            age_gap: u32::MAX,
            big_five_compatibility: 42.0,
            swinger_traits_score: -7.0,
        };

        let n = NormalizedFeatures::from(&hostile);
        let fallback = model_fallback_score(&n);
        let heuristic = heuristic_score(&hostile);

        assert!((0.0..=1.0).contains(&fallback));
        assert!((0.0..=1.0).contains(&heuristic));
    }

    #[test]
    fn test_model_input_excludes_swinger() {
        let n = NormalizedFeatures::from(&features(3, 10.0, 5_000.0, 2));
        let input = n.to_model_input();

        assert_eq!(input.len(), 8);
        assert!((input[7] as f64 - 0.8).abs() < 1e-6);
    }
}
