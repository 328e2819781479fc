use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::*;
use crate::model::config::DistanceMetric;
use crate::model::matrix::{ExpressionMatrix, FeatureNamespace};
use crate::model::templates::TemplateSet;
use crate::pipeline::stage2_templates::resolve_templates;
use crate::pipeline::stage4_classify::nearest_template;
use crate::pipeline::workers::Deadline;

fn engine(metric: DistanceMetric, matrix: &ExpressionMatrix, classes: &[(&str, Vec<String>)]) -> DistanceEngine {
    let templates = TemplateSet::new(
        FeatureNamespace::Symbol,
        classes.iter().map(|(l, m)| (l.to_string(), m.clone())),
    )
    .unwrap();
    DistanceEngine::new(metric, resolve_templates(matrix, &templates).unwrap())
}

fn ids(prefix: &str, range: std::ops::Range<usize>) -> Vec<String> {
    range.map(|i| format!("{prefix}{i}")).collect()
}

#[test]
fn test_permutation_p_value_counts_ties() {
    assert_eq!(permutation_p_value(0.5, &[0.1, 0.6, 0.5, 0.9]), 0.75);
    assert_eq!(permutation_p_value(0.0, &[0.1, 0.2]), 0.5);
    assert_eq!(permutation_p_value(1.0, &[0.1, 0.2]), 1.0);
    assert_eq!(permutation_p_value(0.3, &[f64::NAN, 0.4]), 0.5);
    assert!(permutation_p_value(f64::NAN, &[0.1]).is_nan());
    assert!(permutation_p_value(0.1, &[]).is_nan());
}

#[test]
fn test_sample_seed_is_stable_and_distinct() {
    assert_eq!(sample_seed(7, 3), sample_seed(7, 3));
    assert_ne!(sample_seed(7, 0), sample_seed(7, 1));
    assert_ne!(sample_seed(7, 0), sample_seed(8, 0));
}

#[test]
fn test_null_distribution_reproducible() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let column: Vec<f64> = (0..30).map(|_| rng.gen_range(-2.0..2.0)).collect();
    let matrix = ExpressionMatrix::from_columns(
        FeatureNamespace::Symbol,
        ids("G", 0..30),
        vec!["S".to_string()],
        vec![column],
    )
    .unwrap();
    let e = engine(
        DistanceMetric::Pearson,
        &matrix,
        &[("a", ids("G", 0..8)), ("b", ids("G", 8..16))],
    );
    let profile = e.profile(matrix.column(0));
    let tester = PermutationTester::new(&e, 200, 7);
    let first = tester.null_distribution(&profile, 4, &Deadline::none()).unwrap();
    let second = tester.null_distribution(&profile, 4, &Deadline::none()).unwrap();
    assert_eq!(first.len(), 200);
    assert_eq!(first, second);
    assert_ne!(first, tester.null_distribution(&profile, 5, &Deadline::none()).unwrap());
    assert!(first.iter().all(|d| (0.0..=1.0).contains(d)));
}

#[test]
fn test_perfect_match_reaches_minimum_p_value() {
    // Markers of class a carry the ten largest values.
    let mut column: Vec<f64> = (0..10).map(|i| 10.0 + i as f64).collect();
    column.extend((0..30).map(|i| -1.0 - i as f64));
    let matrix = ExpressionMatrix::from_columns(
        FeatureNamespace::Symbol,
        ids("G", 0..40),
        vec!["S".to_string()],
        vec![column],
    )
    .unwrap();
    let e = engine(
        DistanceMetric::Cosine,
        &matrix,
        &[("a", ids("G", 0..10)), ("b", ids("G", 10..20))],
    );
    let profile = e.profile(matrix.column(0));
    let (k, observed) = nearest_template(&e.distances(&profile)).unwrap();
    assert_eq!(k, 0);
    let tester = PermutationTester::new(&e, 100, 7);
    assert_eq!(tester.p_value(&profile, 0, observed, &Deadline::none()).unwrap(), 1.0 / 100.0);
}

#[test]
fn test_p_values_roughly_uniform_under_null() {
    let n_samples = 300;
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let columns: Vec<Vec<f64>> = (0..n_samples)
        .map(|_| (0..40).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect();
    let matrix = ExpressionMatrix::from_columns(
        FeatureNamespace::Symbol,
        ids("G", 0..40),
        ids("S", 0..n_samples),
        columns,
    )
    .unwrap();
    let e = engine(
        DistanceMetric::Cosine,
        &matrix,
        &[("a", ids("G", 0..8)), ("b", ids("G", 20..28))],
    );
    let tester = PermutationTester::new(&e, 100, 7);
    let mut p_values = Vec::with_capacity(n_samples);
    for s in 0..n_samples {
        let profile = e.profile(matrix.column(s));
        let (_, observed) = nearest_template(&e.distances(&profile)).unwrap();
        let p = tester.p_value(&profile, s, observed, &Deadline::none()).unwrap();
        assert!((0.01..=1.0).contains(&p));
        p_values.push(p);
    }
    let below = p_values.iter().filter(|&&p| p <= 0.2).count() as f64 / n_samples as f64;
    let mean = p_values.iter().sum::<f64>() / n_samples as f64;
    assert!((below - 0.2).abs() < 0.08, "fraction p <= 0.2 was {below}");
    assert!((mean - 0.5).abs() < 0.08, "mean p was {mean}");
}

#[test]
fn test_expired_deadline_abandons_permutations() {
    let column: Vec<f64> = (0..20).map(|i| i as f64).collect();
    let matrix = ExpressionMatrix::from_columns(
        FeatureNamespace::Symbol,
        ids("G", 0..20),
        vec!["S".to_string()],
        vec![column],
    )
    .unwrap();
    let e = engine(
        DistanceMetric::Cosine,
        &matrix,
        &[("a", ids("G", 0..5)), ("b", ids("G", 5..10))],
    );
    let profile = e.profile(matrix.column(0));
    let tester = PermutationTester::new(&e, 1000, 7);
    let expired = Deadline::after(Some(std::time::Duration::ZERO));
    assert_eq!(tester.null_distribution(&profile, 0, &expired), None);
    assert_eq!(tester.p_value(&profile, 0, 0.3, &expired), None);
    // Undefined observations need no draws.
    assert!(tester.p_value(&profile, 0, f64::NAN, &expired).unwrap().is_nan());
}
