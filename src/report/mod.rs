use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::config::NtpConfig;
use crate::pipeline::stage2_templates::TemplateAudit;

pub mod json;
pub mod text;

#[derive(Debug, Clone, Serialize)]
pub struct ToolMeta {
    pub name: String,
    pub version: String,
    pub git_hash: Option<String>,
    pub simd_backend: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputMeta {
    pub n_samples: usize,
    pub n_features: usize,
    pub n_template_features: usize,
    pub namespace: String,
    pub preprocessing: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassStat {
    pub name: String,
    pub count: usize,
    pub fraction: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PValueStats {
    pub min_attainable: f64,
    pub median: f64,
    pub p10: f64,
    pub p90: f64,
    pub p_le_0_05: f64,
    pub fdr_le_0_05: f64,
    pub fdr_le_0_10: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryData {
    pub tool: ToolMeta,
    pub input: InputMeta,
    pub config: NtpConfig,
    pub classes: Vec<ClassStat>,
    pub unassigned: ClassStat,
    pub p_values: PValueStats,
    pub winning_distance_median: f64,
    pub distance_mean: f64,
    pub flags: BTreeMap<String, usize>,
    pub templates: Vec<TemplateAudit>,
}

pub fn format_f64_6(v: f64) -> String {
    if v.is_nan() {
        "NA".to_string()
    } else {
        format!("{:.6}", v)
    }
}

/// Quantile over finite values by nearest rank (ceil). NaN when nothing is finite.
pub fn quantile_indexed(values: &[f64], p: f64) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    let idx = ((n - 1) as f64 * p).ceil() as usize;
    sorted[idx.min(n - 1)]
}

pub fn median(values: &[f64]) -> f64 {
    quantile_indexed(values, 0.5)
}

pub fn p10(values: &[f64]) -> f64 {
    quantile_indexed(values, 0.10)
}

pub fn p90(values: &[f64]) -> f64 {
    quantile_indexed(values, 0.90)
}

pub fn mean_finite(values: &[f64]) -> f64 {
    let mut n = 0usize;
    let mut sum = 0f64;
    for &v in values {
        if v.is_finite() {
            n += 1;
            sum += v;
        }
    }
    if n == 0 { f64::NAN } else { sum / n as f64 }
}

/// Fraction of all values (NaN included in the denominator) that are `<= limit`.
pub fn fraction_le(values: &[f64], limit: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let hits = values.iter().filter(|&&v| v <= limit).count();
    hits as f64 / values.len() as f64
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/mod.rs"]
mod tests;
