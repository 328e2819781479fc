#[inline]
pub fn sum_f64(values: &[f64]) -> f64 {
    backend::sum_f64(values)
}

#[inline]
pub fn sum_sq_f64(values: &[f64]) -> f64 {
    backend::sum_sq_f64(values)
}

/// Sum of squared deviations from `center`.
#[inline]
pub fn centered_sum_sq_f64(values: &[f64], center: f64) -> f64 {
    let mut ss = 0f64;
    for &v in values {
        let d = v - center;
        ss += d * d;
    }
    ss
}

#[inline]
pub fn dot_f64(a: &[f64], b: &[f64]) -> f64 {
    backend::dot_f64(a, b)
}

#[inline]
pub fn backend_name() -> &'static str {
    backend::backend_name()
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
mod backend {
    pub use crate::simd::avx2::*;
}

#[cfg(all(target_arch = "aarch64", target_feature = "neon"))]
mod backend {
    pub use crate::simd::neon::*;
}

#[cfg(not(any(
    all(target_arch = "x86_64", target_feature = "avx2"),
    all(target_arch = "aarch64", target_feature = "neon"),
)))]
mod backend {
    pub use crate::simd::scalar::*;
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
pub mod avx2;
#[cfg(all(target_arch = "aarch64", target_feature = "neon"))]
pub mod neon;
pub mod scalar;

#[cfg(test)]
#[path = "../../tests/src_inline/simd/mod.rs"]
mod tests;
