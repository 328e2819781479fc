use crate::model::config::DistanceMetric;
use crate::model::matrix::ExpressionMatrix;
use crate::model::records::DistanceMatrix;
use crate::pipeline::stage2_templates::ResolvedTemplates;
use crate::simd;

/// `sqrt(0.5 * (1 - f))`, with `f` clamped to [-1, 1]. Undefined similarities map to NaN.
#[inline]
pub fn distance_from_similarity(f: f64) -> f64 {
    if !f.is_finite() {
        return f64::NAN;
    }
    (0.5 * (1.0 - f.clamp(-1.0, 1.0))).sqrt()
}

/// Similarity of two arbitrary paired vectors. Pairs with a missing value on either
/// side are dropped before anything is computed.
pub fn similarity(metric: DistanceMetric, x: &[f64], y: &[f64]) -> f64 {
    let mut xs = Vec::with_capacity(x.len());
    let mut ys = Vec::with_capacity(y.len());
    for (&a, &b) in x.iter().zip(y) {
        if a.is_finite() && b.is_finite() {
            xs.push(a);
            ys.push(b);
        }
    }
    if xs.is_empty() {
        return f64::NAN;
    }
    match metric {
        DistanceMetric::Cosine => cosine(&xs, &ys),
        DistanceMetric::Pearson => pearson(&xs, &ys),
        DistanceMetric::Spearman => pearson(&midranks(&xs), &midranks(&ys)),
        DistanceMetric::Kendall => kendall_tau_b(&xs, &ys),
    }
}

fn cosine(x: &[f64], y: &[f64]) -> f64 {
    let nx = simd::sum_sq_f64(x);
    let ny = simd::sum_sq_f64(y);
    if nx <= 0.0 || ny <= 0.0 {
        return f64::NAN;
    }
    simd::dot_f64(x, y) / (nx.sqrt() * ny.sqrt())
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n < 2 {
        return f64::NAN;
    }
    let mx = simd::sum_f64(x) / n as f64;
    let my = simd::sum_f64(y) / n as f64;
    let mut sxy = 0f64;
    let mut sxx = 0f64;
    let mut syy = 0f64;
    for (&a, &b) in x.iter().zip(y) {
        let da = a - mx;
        let db = b - my;
        sxy += da * db;
        sxx += da * da;
        syy += db * db;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return f64::NAN;
    }
    sxy / (sxx * syy).sqrt()
}

/// Kendall's tau-b by direct pair enumeration.
fn kendall_tau_b(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n < 2 {
        return f64::NAN;
    }
    let mut s = 0i64;
    let mut tied_x = 0u64;
    let mut tied_y = 0u64;
    for i in 0..n {
        for j in (i + 1)..n {
            let sx = sign(x[i] - x[j]);
            let sy = sign(y[i] - y[j]);
            s += sx * sy;
            if sx == 0 {
                tied_x += 1;
            }
            if sy == 0 {
                tied_y += 1;
            }
        }
    }
    let pairs = (n * (n - 1) / 2) as f64;
    let denom = (pairs - tied_x as f64) * (pairs - tied_y as f64);
    if denom <= 0.0 {
        return f64::NAN;
    }
    s as f64 / denom.sqrt()
}

fn sign(v: f64) -> i64 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// 1-based ranks; tied values share the mean of their ranks.
pub fn midranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]).then(a.cmp(&b)));
    let mut ranks = vec![0f64; n];
    let mut start = 0usize;
    while start < n {
        let mut end = start + 1;
        while end < n && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let rank = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }
    ranks
}

/// Number of tied pairs, `sum t(t-1)/2` over groups of equal values.
pub fn tied_pairs(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mut total = 0f64;
    let mut start = 0usize;
    while start < sorted.len() {
        let mut end = start + 1;
        while end < sorted.len() && sorted[end] == sorted[start] {
            end += 1;
        }
        let t = (end - start) as f64;
        total += t * (t - 1.0) / 2.0;
        start = end;
    }
    total
}

/// One sample restricted to the template space, with missing features removed.
///
/// Everything except the order of `values` is invariant under feature-label
/// permutation, so the statistics below are computed once per sample and each
/// class similarity reduces to a sum over that class's marker positions.
#[derive(Debug, Clone)]
pub struct SampleProfile {
    /// Present values in template-space order (mid-ranks for rank metrics).
    pub values: Vec<f64>,
    /// Per class, indices into `values` of the present markers.
    pub class_markers: Vec<Vec<usize>>,
    n: usize,
    mean: f64,
    centered_ss: f64,
    sum_sq: f64,
    tied_pairs: f64,
}

impl SampleProfile {
    pub fn n_present(&self) -> usize {
        self.n
    }

    /// Similarity of `values` (this profile's values in some order) to class `k`.
    pub fn class_similarity(&self, metric: DistanceMetric, values: &[f64], k: usize) -> f64 {
        let markers = &self.class_markers[k];
        let n1 = markers.len();
        if n1 == 0 {
            return f64::NAN;
        }
        let n = self.n;
        let n0 = n - n1;
        let mut s = 0f64;
        for &i in markers {
            s += values[i];
        }
        let n1f = n1 as f64;
        let n0f = n0 as f64;
        match metric {
            DistanceMetric::Cosine => {
                if self.sum_sq <= 0.0 {
                    return f64::NAN;
                }
                s / (self.sum_sq.sqrt() * n1f.sqrt())
            }
            DistanceMetric::Pearson | DistanceMetric::Spearman => {
                if n0 == 0 || self.centered_ss <= 0.0 {
                    return f64::NAN;
                }
                let ss_y = n1f * n0f / n as f64;
                (s - n1f * self.mean) / (self.centered_ss * ss_y).sqrt()
            }
            DistanceMetric::Kendall => {
                if n0 == 0 {
                    return f64::NAN;
                }
                // Marker vs non-marker pairs only; 2U - n1*n0 = concordant - discordant.
                let u = s - n1f * (n1f + 1.0) / 2.0;
                let numer = 2.0 * u - n1f * n0f;
                let pairs = n as f64 * (n as f64 - 1.0) / 2.0;
                let denom_x = pairs - self.tied_pairs;
                if denom_x <= 0.0 {
                    return f64::NAN;
                }
                numer / (denom_x * n1f * n0f).sqrt()
            }
        }
    }
}

/// Distances between samples and indicator templates.
#[derive(Debug, Clone)]
pub struct DistanceEngine {
    metric: DistanceMetric,
    templates: ResolvedTemplates,
}

impl DistanceEngine {
    pub fn new(metric: DistanceMetric, templates: ResolvedTemplates) -> Self {
        Self { metric, templates }
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn templates(&self) -> &ResolvedTemplates {
        &self.templates
    }

    pub fn n_classes(&self) -> usize {
        self.templates.n_classes()
    }

    /// Restricts a full matrix column to the template space.
    pub fn profile(&self, column: &[f64]) -> SampleProfile {
        let t = self.templates.n_features();
        let mut local = vec![usize::MAX; t];
        let mut values = Vec::with_capacity(t);
        for (pos, &row) in self.templates.feature_rows.iter().enumerate() {
            let v = column[row];
            if v.is_finite() {
                local[pos] = values.len();
                values.push(v);
            }
        }
        let class_markers = self
            .templates
            .class_markers
            .iter()
            .map(|markers| {
                markers
                    .iter()
                    .filter_map(|&p| (local[p] != usize::MAX).then_some(local[p]))
                    .collect()
            })
            .collect();

        let mut tied = 0f64;
        if self.metric.uses_ranks() {
            tied = tied_pairs(&values);
            values = midranks(&values);
        }
        let n = values.len();
        let mean = if n > 0 {
            simd::sum_f64(&values) / n as f64
        } else {
            f64::NAN
        };
        let centered_ss = if n > 0 {
            simd::centered_sum_sq_f64(&values, mean)
        } else {
            0.0
        };
        let sum_sq = simd::sum_sq_f64(&values);

        SampleProfile {
            values,
            class_markers,
            n,
            mean,
            centered_ss,
            sum_sq,
            tied_pairs: tied,
        }
    }

    /// Class distances for `values`, a permutation of `profile.values`.
    pub fn distances_into(&self, profile: &SampleProfile, values: &[f64], out: &mut [f64]) {
        for (k, slot) in out.iter_mut().enumerate() {
            *slot = distance_from_similarity(profile.class_similarity(self.metric, values, k));
        }
    }

    pub fn distances(&self, profile: &SampleProfile) -> Vec<f64> {
        let mut out = vec![f64::NAN; self.n_classes()];
        self.distances_into(profile, &profile.values, &mut out);
        out
    }

    pub fn sample_distances(&self, matrix: &ExpressionMatrix, sample: usize) -> Vec<f64> {
        self.distances(&self.profile(matrix.column(sample)))
    }

    pub fn distance_matrix(&self, matrix: &ExpressionMatrix) -> DistanceMatrix {
        let rows: Vec<Vec<f64>> = (0..matrix.n_samples())
            .map(|s| self.sample_distances(matrix, s))
            .collect();
        DistanceMatrix::from_rows(self.n_classes(), &rows)
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage3_distance.rs"]
mod tests;
