use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::*;
use crate::model::matrix::FeatureNamespace;
use crate::model::templates::TemplateSet;
use crate::pipeline::stage2_templates::resolve_templates;

const METRICS: [DistanceMetric; 4] = [
    DistanceMetric::Cosine,
    DistanceMetric::Pearson,
    DistanceMetric::Spearman,
    DistanceMetric::Kendall,
];

fn feature_ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("G{i}")).collect()
}

fn sample_ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("S{i}")).collect()
}

fn engine_for(
    metric: DistanceMetric,
    matrix: &ExpressionMatrix,
    classes: Vec<(String, Vec<String>)>,
) -> DistanceEngine {
    let templates = TemplateSet::new(FeatureNamespace::Symbol, classes).unwrap();
    DistanceEngine::new(metric, resolve_templates(matrix, &templates).unwrap())
}

fn normal(rng: &mut ChaCha8Rng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn random_problem(
    seed: u64,
    n_features: usize,
    n_samples: usize,
    n_classes: usize,
    marker_prob: f64,
    missing_prob: f64,
    round: bool,
) -> (ExpressionMatrix, Vec<(String, Vec<String>)>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let ids = feature_ids(n_features);
    let mut columns = Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        let col: Vec<f64> = (0..n_features)
            .map(|_| {
                if rng.gen_bool(missing_prob) {
                    f64::NAN
                } else if round {
                    (normal(&mut rng) * 2.0).round() / 2.0
                } else {
                    normal(&mut rng)
                }
            })
            .collect();
        columns.push(col);
    }
    let matrix = ExpressionMatrix::from_columns(
        FeatureNamespace::Symbol,
        ids.clone(),
        sample_ids(n_samples),
        columns,
    )
    .unwrap();
    let classes = (0..n_classes)
        .map(|k| {
            let mut markers: Vec<String> = ids
                .iter()
                .filter(|_| rng.gen_bool(marker_prob))
                .cloned()
                .collect();
            if markers.is_empty() {
                markers.push(ids[k % n_features].clone());
            }
            (format!("class{k}"), markers)
        })
        .collect();
    (matrix, classes)
}

fn reference_distance(
    engine: &DistanceEngine,
    matrix: &ExpressionMatrix,
    sample: usize,
    k: usize,
) -> f64 {
    let templates = engine.templates();
    let x: Vec<f64> = templates
        .feature_rows
        .iter()
        .map(|&row| matrix.get(row, sample))
        .collect();
    distance_from_similarity(similarity(engine.metric(), &x, &templates.indicator(k)))
}

fn same(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || (a - b).abs() < 1e-9
}

#[test]
fn test_distance_from_similarity_bounds() {
    assert_eq!(distance_from_similarity(1.0), 0.0);
    assert_eq!(distance_from_similarity(-1.0), 1.0);
    assert_eq!(distance_from_similarity(1.0 + 1e-12), 0.0);
    assert_eq!(distance_from_similarity(-3.0), 1.0);
    assert!((distance_from_similarity(0.0) - 0.5f64.sqrt()).abs() < 1e-15);
    assert!(distance_from_similarity(f64::NAN).is_nan());
}

#[test]
fn test_cosine_two_class_example() {
    let matrix = ExpressionMatrix::from_columns(
        FeatureNamespace::Symbol,
        feature_ids(4),
        sample_ids(1),
        vec![vec![2.0, 2.0, -2.0, -2.0]],
    )
    .unwrap();
    let engine = engine_for(
        DistanceMetric::Cosine,
        &matrix,
        vec![
            ("A".to_string(), vec!["G0".to_string(), "G1".to_string()]),
            ("B".to_string(), vec!["G2".to_string(), "G3".to_string()]),
        ],
    );
    let d = engine.sample_distances(&matrix, 0);
    assert!((d[0] - 0.382683).abs() < 1e-6, "{d:?}");
    assert!((d[1] - 0.923880).abs() < 1e-6, "{d:?}");
}

#[test]
fn test_midranks_and_tied_pairs() {
    assert_eq!(midranks(&[3.0, 1.0, 3.0, 2.0]), vec![3.5, 1.0, 3.5, 2.0]);
    assert_eq!(tied_pairs(&[1.0, 1.0, 1.0, 2.0, 2.0]), 4.0);
    assert_eq!(tied_pairs(&[1.0, 2.0]), 0.0);
}

#[test]
fn test_reference_similarity_known_values() {
    let x = [1.0, 2.0, 3.0, 4.0];
    let y = [2.0, 4.0, 6.0, 8.0];
    assert!((similarity(DistanceMetric::Pearson, &x, &y) - 1.0).abs() < 1e-12);
    assert!((similarity(DistanceMetric::Spearman, &x, &[1.0, 3.0, 2.0, 4.0]) - 0.8).abs() < 1e-12);
    // 5 concordant, 1 discordant pair.
    let tau = similarity(DistanceMetric::Kendall, &x, &[1.0, 3.0, 2.0, 4.0]);
    assert!((tau - 4.0 / 6.0).abs() < 1e-12);
    assert!(similarity(DistanceMetric::Pearson, &x, &[1.0; 4]).is_nan());
    assert!(similarity(DistanceMetric::Cosine, &[f64::NAN], &[1.0]).is_nan());
}

#[test]
fn test_fast_path_matches_reference_for_every_metric() {
    for (seed, round) in [(1u64, false), (2, true)] {
        let (matrix, classes) = random_problem(seed, 60, 12, 4, 0.2, 0.1, round);
        for metric in METRICS {
            let engine = engine_for(metric, &matrix, classes.clone());
            for s in 0..matrix.n_samples() {
                let fast = engine.sample_distances(&matrix, s);
                for (k, &d) in fast.iter().enumerate() {
                    let expected = reference_distance(&engine, &matrix, s, k);
                    assert!(
                        same(d, expected),
                        "{metric} sample {s} class {k}: fast {d} reference {expected}"
                    );
                }
            }
        }
    }
}

#[test]
fn test_distances_in_unit_interval() {
    let (matrix, classes) = random_problem(3, 80, 20, 5, 0.15, 0.05, false);
    for metric in METRICS {
        let engine = engine_for(metric, &matrix, classes.clone());
        let dm = engine.distance_matrix(&matrix);
        assert_eq!(dm.n_samples(), 20);
        assert_eq!(dm.n_classes(), 5);
        for &d in dm.values() {
            assert!(d.is_nan() || (0.0..=1.0).contains(&d), "{metric}: {d}");
        }
    }
}

#[test]
fn test_missing_markers_give_nan_distance() {
    let matrix = ExpressionMatrix::from_columns(
        FeatureNamespace::Symbol,
        feature_ids(4),
        sample_ids(1),
        vec![vec![1.0, f64::NAN, -1.0, 0.5]],
    )
    .unwrap();
    let engine = engine_for(
        DistanceMetric::Pearson,
        &matrix,
        vec![
            ("A".to_string(), vec!["G1".to_string()]),
            ("B".to_string(), vec!["G0".to_string(), "G3".to_string()]),
        ],
    );
    let profile = engine.profile(matrix.column(0));
    assert_eq!(profile.n_present(), 2);
    let d = engine.distances(&profile);
    assert!(d[0].is_nan());
    // B covers every present feature, so Pearson is undefined too.
    assert!(d[1].is_nan());
}

#[test]
fn test_uncorrelated_mean_distance_near_sqrt_half() {
    let (matrix, classes) = random_problem(4, 400, 60, 4, 0.05, 0.0, false);
    let engine = engine_for(DistanceMetric::Cosine, &matrix, classes);
    let dm = engine.distance_matrix(&matrix);
    let finite: Vec<f64> = dm.values().iter().copied().filter(|v| v.is_finite()).collect();
    let mean = finite.iter().sum::<f64>() / finite.len() as f64;
    assert!((mean - 0.5f64.sqrt()).abs() < 0.02, "mean distance {mean}");
}
