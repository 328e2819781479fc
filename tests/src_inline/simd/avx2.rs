use super::*;
use crate::simd::scalar;

#[test]
fn test_sum_equiv() {
    let v = [0.1f64, 0.2, 0.3, 0.4, 0.5, 0.6, 1.1, 9.75, -3.5];
    assert_eq!(sum_f64(&v).to_bits(), scalar::sum_f64(&v).to_bits());
    assert_eq!(sum_sq_f64(&v).to_bits(), scalar::sum_sq_f64(&v).to_bits());
}

#[test]
fn test_dot_equiv() {
    let a = [0.1f64, 2.0, 0.3, -4.0, 0.7, 1.25];
    let b = [1.5f64, -0.5, 0.25, 2.0, 3.0, -1.0];
    assert_eq!(dot_f64(&a, &b).to_bits(), scalar::dot_f64(&a, &b).to_bits());
}
