// Criterion benchmarks for Conecta AI

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use conecta_ai::core::distance::haversine_distance;
use conecta_ai::core::scoring::{heuristic_score, model_fallback_score, NormalizedFeatures};
use conecta_ai::models::CompatibilityFeatures;
use conecta_ai::services::ScoreCache;

fn sample_features(seed: u32) -> CompatibilityFeatures {
    CompatibilityFeatures {
        likes_given: seed % 15,
        likes_received: (seed * 3) % 12,
        comments_count: seed % 40,
        proximity_km: (seed % 200) as f64,
        response_time_ms: ((seed * 997) % 120_000) as f64,
        shared_interests_count: seed % 12,
        age_gap: seed % 30,
        big_five_compatibility: ((seed % 100) as f64) / 100.0,
        swinger_traits_score: ((seed % 77) as f64) / 77.0,
    }
}

fn bench_haversine_distance(c: &mut Criterion) {
    c.bench_function("haversine_distance", |b| {
        b.iter(|| {
            haversine_distance(
                black_box(19.4326),
                black_box(-99.1332),
                black_box(20.6597),
                black_box(-103.3496),
            )
        });
    });
}

fn bench_normalization(c: &mut Criterion) {
    let features = sample_features(7);
    c.bench_function("feature_normalization", |b| {
        b.iter(|| NormalizedFeatures::from(black_box(&features)));
    });
}

fn bench_fallback_scoring(c: &mut Criterion) {
    let features = sample_features(7);
    let normalized = NormalizedFeatures::from(&features);

    c.bench_function("model_fallback_score", |b| {
        b.iter(|| model_fallback_score(black_box(&normalized)));
    });

    c.bench_function("heuristic_score", |b| {
        b.iter(|| heuristic_score(black_box(&features)));
    });
}

fn bench_cache_key(c: &mut Criterion) {
    c.bench_function("cache_key_derivation", |b| {
        b.iter(|| ScoreCache::key(black_box("f47ac10b-58cc"), black_box("9e107d9d-372b")));
    });
}

criterion_group!(
    benches,
    bench_haversine_distance,
    bench_normalization,
    bench_fallback_scoring,
    bench_cache_key
);
criterion_main!(benches);
