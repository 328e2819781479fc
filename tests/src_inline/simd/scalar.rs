use super::*;

#[test]
fn test_sum() {
    let v = [1.0f64, 2.0, 3.0];
    assert_eq!(sum_f64(&v), 6.0);
}

#[test]
fn test_sum_sq() {
    let v = [1.0f64, -2.0, 3.0];
    assert_eq!(sum_sq_f64(&v), 14.0);
}

#[test]
fn test_dot_uses_shorter_length() {
    let a = [1.0f64, 2.0, 3.0];
    let b = [4.0f64, 5.0];
    assert_eq!(dot_f64(&a, &b), 14.0);
}
