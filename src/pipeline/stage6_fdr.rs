use std::cmp::Ordering;

/// Benjamini-Hochberg adjustment over every finite p-value.
///
/// NaN inputs are left out of the family (`m` counts finite values only) and come
/// back as NaN at their original positions. Equal p-values are ordered by position.
pub fn benjamini_hochberg(p_values: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN; p_values.len()];
    let mut order: Vec<usize> = (0..p_values.len())
        .filter(|&i| !p_values[i].is_nan())
        .collect();
    let m = order.len();
    if m == 0 {
        return out;
    }
    order.sort_by(|&i, &j| {
        p_values[i]
            .partial_cmp(&p_values[j])
            .unwrap_or(Ordering::Equal)
            .then(i.cmp(&j))
    });

    let mut running = 1.0_f64;
    for (rank0, &idx) in order.iter().enumerate().rev() {
        let rank = rank0 + 1;
        let adj = p_values[idx] * m as f64 / rank as f64;
        running = running.min(adj);
        out[idx] = running.clamp(0.0, 1.0);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage6_fdr.rs"]
mod tests;
