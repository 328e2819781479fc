use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::NtpError;
use crate::input::{InputError, open_maybe_gz};
use crate::model::config::{NtpConfig, Normalization};
use crate::model::matrix::{ExpressionMatrix, FeatureNamespace};

/// Offset added before taking log2 so that zero counts stay finite.
pub const LOG2_OFFSET: f64 = 0.25;

/// Boundary between raw inputs and the engine. Implementations return a new
/// matrix that is row-centred and row-scaled, with unusable values set to NaN.
pub trait Preprocessor {
    fn name(&self) -> String;
    fn apply(&self, matrix: &ExpressionMatrix) -> Result<ExpressionMatrix, NtpError>;
}

/// Per-feature mean and standard deviation from a reference cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    pub namespace: FeatureNamespace,
    pub feature_ids: Vec<String>,
    pub means: Vec<f64>,
    pub sds: Vec<f64>,
    /// Quantile target of the reference counts, present when the cohort was
    /// quantile normalized. Single samples are mapped onto it instead of
    /// onto their own distribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantile_target: Option<Vec<f64>>,
}

impl FeatureStats {
    pub fn from_matrix(matrix: &ExpressionMatrix) -> Self {
        let n = matrix.n_features();
        let mut means = Vec::with_capacity(n);
        let mut sds = Vec::with_capacity(n);
        for f in 0..n {
            let (mean, sd) = mean_sd(&matrix.row(f));
            means.push(mean);
            sds.push(sd);
        }
        Self {
            namespace: matrix.namespace(),
            feature_ids: matrix.feature_ids().to_vec(),
            means,
            sds,
            quantile_target: None,
        }
    }

    pub fn with_quantile_target(mut self, target: Vec<f64>) -> Self {
        self.quantile_target = Some(target);
        self
    }

    pub fn load_json(path: &Path) -> Result<Self, InputError> {
        let reader = open_maybe_gz(path)?;
        let stats: FeatureStats = serde_json::from_reader(reader)?;
        if stats.means.len() != stats.feature_ids.len() || stats.sds.len() != stats.feature_ids.len()
        {
            return Err(InputError::InvalidInput(format!(
                "reference stats {} have mismatched lengths",
                path.display()
            )));
        }
        if let Some(target) = &stats.quantile_target {
            if target.is_empty() || target.iter().any(|v| !v.is_finite()) {
                return Err(InputError::InvalidInput(format!(
                    "reference stats {} have an empty or non-finite quantile target",
                    path.display()
                )));
            }
        }
        Ok(stats)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), InputError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let w = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(w, self)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum Scaling {
    /// The caller guarantees rows are already centred and scaled.
    AssumeScaled,
    /// Rows are centred and scaled with this cohort's own statistics.
    Cohort,
    /// Rows are centred and scaled with reference statistics (single-sample mode).
    Reference(FeatureStats),
}

#[derive(Debug, Clone)]
pub struct StandardPreprocessor {
    pub normalization: Normalization,
    pub scaling: Scaling,
}

impl StandardPreprocessor {
    pub fn identity() -> Self {
        Self {
            normalization: Normalization::AsIs,
            scaling: Scaling::AssumeScaled,
        }
    }

    /// Derives the preprocessing policy from a resolved configuration. Reference
    /// statistics, when supplied, take precedence over cohort scaling.
    pub fn from_config(config: &NtpConfig, reference: Option<FeatureStats>) -> Self {
        let scaling = match reference {
            Some(stats) => Scaling::Reference(stats),
            None if config.scale_rows || config.is_count_data => Scaling::Cohort,
            None => Scaling::AssumeScaled,
        };
        Self {
            normalization: config.normalization,
            scaling,
        }
    }
}

impl StandardPreprocessor {
    fn reference_quantile_target(&self) -> Option<&[f64]> {
        match &self.scaling {
            Scaling::Reference(stats) => stats.quantile_target.as_deref(),
            _ => None,
        }
    }
}

impl Preprocessor for StandardPreprocessor {
    fn name(&self) -> String {
        let norm = match self.normalization {
            Normalization::AsIs => "as-is",
            Normalization::Log2 => "log2",
            Normalization::QuantileLog2 => "quantile+log2",
        };
        let scale = match self.scaling {
            Scaling::AssumeScaled => "assume-scaled",
            Scaling::Cohort => "cohort-scaled",
            Scaling::Reference(_) => "reference-scaled",
        };
        format!("{norm}/{scale}")
    }

    fn apply(&self, matrix: &ExpressionMatrix) -> Result<ExpressionMatrix, NtpError> {
        let n_features = matrix.n_features();
        let mut values = matrix.values().to_vec();

        match self.normalization {
            Normalization::AsIs => {}
            Normalization::Log2 => log2_in_place(&mut values),
            Normalization::QuantileLog2 => {
                match self.reference_quantile_target() {
                    Some(target) => quantile_map(&mut values, n_features, target),
                    None => quantile_normalize(&mut values, n_features),
                }
                log2_in_place(&mut values);
            }
        }

        match &self.scaling {
            Scaling::AssumeScaled => {}
            Scaling::Cohort => {
                let stats = row_stats(&values, n_features);
                scale_rows(&mut values, n_features, &stats);
            }
            Scaling::Reference(reference) => {
                if reference.namespace != matrix.namespace() {
                    return Err(NtpError::config(format!(
                        "reference statistics use namespace {} but the matrix uses {}",
                        reference.namespace,
                        matrix.namespace()
                    )));
                }
                let by_id: HashMap<&str, usize> = reference
                    .feature_ids
                    .iter()
                    .enumerate()
                    .map(|(i, id)| (id.as_str(), i))
                    .collect();
                let mut stats = Vec::with_capacity(n_features);
                let mut unmatched = 0usize;
                for id in matrix.feature_ids() {
                    match by_id.get(id.as_str()) {
                        Some(&i) => stats.push((reference.means[i], reference.sds[i])),
                        None => {
                            unmatched += 1;
                            stats.push((f64::NAN, f64::NAN));
                        }
                    }
                }
                if unmatched > 0 {
                    tracing::warn!(
                        "{} of {} features have no reference statistics and are treated as missing",
                        unmatched,
                        n_features
                    );
                }
                scale_rows(&mut values, n_features, &stats);
            }
        }

        Ok(matrix.with_values(values))
    }
}

/// Mean and sample standard deviation over the finite values.
pub fn mean_sd(values: &[f64]) -> (f64, f64) {
    let mut n = 0usize;
    let mut sum = 0f64;
    for &v in values {
        if v.is_finite() {
            n += 1;
            sum += v;
        }
    }
    if n == 0 {
        return (f64::NAN, f64::NAN);
    }
    let mean = sum / n as f64;
    if n < 2 {
        return (mean, f64::NAN);
    }
    let mut ss = 0f64;
    for &v in values {
        if v.is_finite() {
            let d = v - mean;
            ss += d * d;
        }
    }
    (mean, (ss / (n - 1) as f64).sqrt())
}

fn row_stats(values: &[f64], n_features: usize) -> Vec<(f64, f64)> {
    let n_samples = if n_features == 0 {
        0
    } else {
        values.len() / n_features
    };
    let mut row = vec![0f64; n_samples];
    let mut out = Vec::with_capacity(n_features);
    for f in 0..n_features {
        for (s, slot) in row.iter_mut().enumerate() {
            *slot = values[s * n_features + f];
        }
        out.push(mean_sd(&row));
    }
    out
}

/// Rows whose standard deviation is zero or undefined become missing.
fn scale_rows(values: &mut [f64], n_features: usize, stats: &[(f64, f64)]) {
    for (idx, v) in values.iter_mut().enumerate() {
        let (mean, sd) = stats[idx % n_features];
        *v = if v.is_finite() && mean.is_finite() && sd.is_finite() && sd > 0.0 {
            (*v - mean) / sd
        } else {
            f64::NAN
        };
    }
}

fn log2_in_place(values: &mut [f64]) {
    for v in values.iter_mut() {
        let shifted = *v + LOG2_OFFSET;
        *v = if shifted > 0.0 { shifted.log2() } else { f64::NAN };
    }
}

/// Column quantile normalization onto the mean of the sorted columns.
pub fn quantile_normalize(values: &mut [f64], n_features: usize) {
    let target = quantile_target(values, n_features);
    quantile_map(values, n_features, &target);
}

/// Mean of the sorted columns (sample-major `values`). Columns with missing
/// values contribute through linear interpolation onto the `n_features` grid.
pub fn quantile_target(values: &[f64], n_features: usize) -> Vec<f64> {
    if n_features == 0 {
        return Vec::new();
    }
    let n_samples = values.len() / n_features;

    let mut sorted_cols: Vec<Vec<f64>> = Vec::with_capacity(n_samples);
    for s in 0..n_samples {
        let col = &values[s * n_features..(s + 1) * n_features];
        let mut finite: Vec<f64> = col.iter().copied().filter(|v| v.is_finite()).collect();
        finite.sort_by(f64::total_cmp);
        sorted_cols.push(finite);
    }

    let mut target = vec![0f64; n_features];
    let mut contributors = vec![0usize; n_features];
    for sorted in &sorted_cols {
        if sorted.is_empty() {
            continue;
        }
        for (i, slot) in target.iter_mut().enumerate() {
            *slot += value_at_rank(sorted, i, n_features);
            contributors[i] += 1;
        }
    }
    for (slot, &c) in target.iter_mut().zip(&contributors) {
        if c > 0 {
            *slot /= c as f64;
        } else {
            *slot = f64::NAN;
        }
    }
    target
}

/// Replaces each column's values by `target` at the same ranks. Tied values
/// share the mean of their target block; `target` may have a different length
/// than the columns and is interpolated.
pub fn quantile_map(values: &mut [f64], n_features: usize, target: &[f64]) {
    if n_features == 0 || target.is_empty() {
        return;
    }
    let n_samples = values.len() / n_features;
    for s in 0..n_samples {
        let col = &mut values[s * n_features..(s + 1) * n_features];
        let mut order: Vec<usize> = (0..n_features).filter(|&f| col[f].is_finite()).collect();
        let n_valid = order.len();
        if n_valid == 0 {
            continue;
        }
        order.sort_by(|&a, &b| col[a].total_cmp(&col[b]).then(a.cmp(&b)));

        let mut assigned = vec![0f64; n_valid];
        let mut start = 0usize;
        while start < n_valid {
            let mut end = start + 1;
            while end < n_valid && col[order[end]] == col[order[start]] {
                end += 1;
            }
            let mut acc = 0f64;
            for r in start..end {
                acc += value_at_rank(target, r, n_valid);
            }
            let value = acc / (end - start) as f64;
            for slot in assigned.iter_mut().take(end).skip(start) {
                *slot = value;
            }
            start = end;
        }
        for (r, &f) in order.iter().enumerate() {
            col[f] = assigned[r];
        }
    }
}

/// Value of a sorted slice at rank `rank` of an `n`-element grid, linearly
/// interpolated when the slice has a different length.
fn value_at_rank(sorted: &[f64], rank: usize, n: usize) -> f64 {
    let len = sorted.len();
    if len == n {
        return sorted[rank];
    }
    if len == 1 || n <= 1 {
        return sorted[0];
    }
    let num = rank * (len - 1);
    let lo = num / (n - 1);
    let rem = num % (n - 1);
    if rem == 0 {
        return sorted[lo];
    }
    let frac = rem as f64 / (n - 1) as f64;
    sorted[lo] + (sorted[lo + 1] - sorted[lo]) * frac
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage1_preprocess.rs"]
mod tests;
