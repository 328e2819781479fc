use super::*;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-12
}

#[test]
fn test_bh_known_values() {
    let q = benjamini_hochberg(&[0.01, 0.04, 0.03, 0.2]);
    assert!(close(q[0], 0.04));
    assert!(close(q[1], 0.04 * 4.0 / 3.0));
    assert!(close(q[2], 0.04 * 4.0 / 3.0));
    assert!(close(q[3], 0.2));
}

#[test]
fn test_bh_preserves_rank_and_dominates_p() {
    let p = [0.3, 0.001, 0.05, 0.9, 0.02, 0.02, 0.6, 0.011];
    let q = benjamini_hochberg(&p);
    for i in 0..p.len() {
        assert!(q[i] >= p[i], "q[{i}]={} < p={}", q[i], p[i]);
        assert!(q[i] <= 1.0);
        for j in 0..p.len() {
            if p[i] < p[j] {
                assert!(q[i] <= q[j]);
            }
        }
    }
    assert_eq!(q[4], q[5]);
}

#[test]
fn test_bh_nan_excluded_from_family() {
    let q = benjamini_hochberg(&[0.02, f64::NAN, 0.04]);
    assert!(close(q[0], 0.04));
    assert!(q[1].is_nan());
    assert!(close(q[2], 0.04));
}

#[test]
fn test_bh_clamps_and_handles_empty() {
    assert_eq!(benjamini_hochberg(&[1.0, 1.0]), vec![1.0, 1.0]);
    assert!(benjamini_hochberg(&[]).is_empty());
    assert!(benjamini_hochberg(&[f64::NAN]).iter().all(|q| q.is_nan()));
}
