use super::*;

#[test]
fn test_nearest_template_picks_minimum() {
    assert_eq!(nearest_template(&[0.6, 0.2, 0.4]), Some((1, 0.2)));
}

#[test]
fn test_nearest_template_tie_goes_to_lowest_index() {
    assert_eq!(nearest_template(&[0.5, 0.3, 0.3]), Some((1, 0.3)));
}

#[test]
fn test_nearest_template_skips_nan() {
    assert_eq!(nearest_template(&[f64::NAN, 0.7, 0.9]), Some((1, 0.7)));
    assert_eq!(nearest_template(&[f64::NAN, f64::NAN]), None);
    assert_eq!(nearest_template(&[]), None);
}

#[test]
fn test_classify_sample_flags() {
    let full = classify_sample(&[0.4, 0.1]);
    assert_eq!(full.prediction, Prediction::Class(1));
    assert_eq!(full.distance, 0.1);
    assert!(full.flags.is_empty());

    let partial = classify_sample(&[f64::NAN, 0.8]);
    assert_eq!(partial.prediction, Prediction::Class(1));
    assert_eq!(partial.flags, vec![Flag::PartialTemplates]);

    let none = classify_sample(&[f64::NAN, f64::NAN]);
    assert_eq!(none.prediction, Prediction::Unassigned);
    assert!(none.distance.is_nan());
    assert_eq!(none.flags, vec![Flag::NoUsableTemplate]);
}

#[test]
fn test_run_stage4_preserves_sample_order() {
    let dm = DistanceMatrix::from_rows(
        2,
        &[vec![0.1, 0.9], vec![0.9, 0.1], vec![f64::NAN, f64::NAN]],
    );
    let out = run_stage4(&dm);
    let predictions: Vec<Prediction> = out.iter().map(|c| c.prediction).collect();
    assert_eq!(
        predictions,
        vec![
            Prediction::Class(0),
            Prediction::Class(1),
            Prediction::Unassigned
        ]
    );
}
