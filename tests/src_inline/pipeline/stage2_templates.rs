use super::*;
use crate::model::matrix::FeatureNamespace;

fn matrix(features: &[&str]) -> ExpressionMatrix {
    let rows = features.iter().map(|_| vec![0.0, 1.0]).collect();
    ExpressionMatrix::from_rows(
        FeatureNamespace::Symbol,
        features.iter().map(|s| s.to_string()).collect(),
        vec!["S1".to_string(), "S2".to_string()],
        rows,
    )
    .unwrap()
}

#[test]
fn test_resolve_union_and_positions() {
    let m = matrix(&["A", "B", "C", "D", "E"]);
    let t = TemplateSet::new(
        FeatureNamespace::Symbol,
        [("x", vec!["D", "B", "Z"]), ("y", vec!["b", "E"])],
    )
    .unwrap();
    let r = resolve_templates(&m, &t).unwrap();
    assert_eq!(r.labels, vec!["x".to_string(), "y".to_string()]);
    assert_eq!(r.feature_rows, vec![1, 3, 4]);
    assert_eq!(r.n_features(), 3);
    assert_eq!(r.n_classes(), 2);
    assert_eq!(r.class_markers, vec![vec![0, 1], vec![0, 2]]);
    assert_eq!(r.indicator(1), vec![1.0, 0.0, 1.0]);

    assert_eq!(r.audits[0].markers_defined, 3);
    assert_eq!(r.audits[0].markers_matched, 2);
    assert_eq!(r.audits[0].missing_markers, vec!["Z".to_string()]);
    assert!(r.audits[1].missing_markers.is_empty());
}

#[test]
fn test_zero_overlap_is_configuration_error() {
    let m = matrix(&["A", "B"]);
    let t = TemplateSet::new(
        FeatureNamespace::Symbol,
        [("ok", vec!["A"]), ("empty", vec!["Q", "R"])],
    )
    .unwrap();
    match resolve_templates(&m, &t) {
        Err(NtpError::Config(msg)) => assert!(msg.contains("no markers"), "{msg}"),
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn test_namespace_mismatch() {
    let m = matrix(&["7157"]);
    let t = TemplateSet::new(FeatureNamespace::Entrez, [("x", vec!["7157"])]).unwrap();
    assert!(matches!(
        resolve_templates(&m, &t),
        Err(NtpError::Config(_))
    ));
}

#[test]
fn test_template_set_validation() {
    let empty: Vec<(&str, Vec<&str>)> = Vec::new();
    assert!(TemplateSet::new(FeatureNamespace::Symbol, empty).is_err());
    assert!(
        TemplateSet::new(
            FeatureNamespace::Symbol,
            [("x", vec!["A"]), ("x", vec!["B"])]
        )
        .is_err()
    );
    assert!(TemplateSet::new(FeatureNamespace::Symbol, [("x", Vec::<&str>::new())]).is_err());
    assert!(TemplateSet::new(FeatureNamespace::Symbol, [(" ", vec!["A"])]).is_err());
}
