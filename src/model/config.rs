use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::NtpError;
use crate::input::{InputError, open_maybe_gz};
use crate::model::matrix::FeatureNamespace;

pub const DEFAULT_N_PERM: usize = 1000;
/// Below this the permutation p-value grid is too coarse to be useful.
pub const MIN_N_PERM: usize = 100;
pub const DEFAULT_SEED: u64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Pearson,
    Spearman,
    Kendall,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Pearson => "pearson",
            DistanceMetric::Spearman => "spearman",
            DistanceMetric::Kendall => "kendall",
        }
    }

    /// Rank-based metrics work on mid-ranks of the sample profile.
    pub fn uses_ranks(&self) -> bool {
        matches!(self, DistanceMetric::Spearman | DistanceMetric::Kendall)
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = NtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(DistanceMetric::Cosine),
            "pearson" => Ok(DistanceMetric::Pearson),
            "spearman" => Ok(DistanceMetric::Spearman),
            "kendall" => Ok(DistanceMetric::Kendall),
            other => Err(NtpError::config(format!(
                "unknown distance metric {other:?} (use cosine|pearson|spearman|kendall)"
            ))),
        }
    }
}

/// Input transform applied before row scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Values are used as given.
    #[default]
    AsIs,
    /// `log2(x + 0.25)`, for intensities that are not yet on a log scale.
    Log2,
    /// Column quantile normalization followed by `log2(x + 0.25)`, for counts.
    QuantileLog2,
}

impl FromStr for Normalization {
    type Err = NtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "as_is" | "none" => Ok(Normalization::AsIs),
            "log2" => Ok(Normalization::Log2),
            "quantile_log2" => Ok(Normalization::QuantileLog2),
            other => Err(NtpError::config(format!(
                "unknown normalization {other:?} (use as-is|log2|quantile-log2)"
            ))),
        }
    }
}

/// Confidence mask applied after FDR adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Threshold {
    PValue(f64),
    Fdr(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NtpConfig {
    pub distance_metric: DistanceMetric,
    pub n_perm: usize,
    pub worker_count: usize,
    /// Count data is quantile normalized and log2 transformed, then row scaled.
    pub is_count_data: bool,
    /// Explicit log policy for non-count inputs; ignored when `is_count_data` is set.
    pub normalization: Normalization,
    /// Centre and scale rows with the cohort's own statistics.
    pub scale_rows: bool,
    pub random_seed: u64,
    pub p_value_threshold: Option<f64>,
    pub fdr_threshold: Option<f64>,
    pub timeout_secs: Option<f64>,
    pub namespace: FeatureNamespace,
}

impl Default for NtpConfig {
    fn default() -> Self {
        Self {
            distance_metric: DistanceMetric::Cosine,
            n_perm: DEFAULT_N_PERM,
            worker_count: 1,
            is_count_data: false,
            normalization: Normalization::AsIs,
            scale_rows: false,
            random_seed: DEFAULT_SEED,
            p_value_threshold: None,
            fdr_threshold: None,
            timeout_secs: None,
            namespace: FeatureNamespace::Symbol,
        }
    }
}

impl NtpConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, InputError> {
        let reader = open_maybe_gz(path)?;
        let config = serde_json::from_reader(reader)?;
        Ok(config)
    }

    /// Validates the configuration and returns the effective copy used for a run.
    pub fn resolve(&self) -> Result<NtpConfig, NtpError> {
        let mut out = self.clone();
        if out.n_perm == 0 {
            return Err(NtpError::config("n_perm must be a positive integer"));
        }
        if out.n_perm < MIN_N_PERM {
            tracing::warn!(
                "n_perm={} is below the minimum of {}; using {}",
                out.n_perm,
                MIN_N_PERM,
                MIN_N_PERM
            );
            out.n_perm = MIN_N_PERM;
        }
        if out.worker_count == 0 {
            return Err(NtpError::config("worker_count must be at least 1"));
        }
        for (name, value) in [
            ("p_value_threshold", out.p_value_threshold),
            ("fdr_threshold", out.fdr_threshold),
        ] {
            if let Some(t) = value {
                if !(0.0..=1.0).contains(&t) {
                    return Err(NtpError::config(format!(
                        "{name} must be within [0, 1], got {t}"
                    )));
                }
            }
        }
        if out.p_value_threshold.is_some() && out.fdr_threshold.is_some() {
            return Err(NtpError::config(
                "set at most one of p_value_threshold and fdr_threshold",
            ));
        }
        if let Some(t) = out.timeout_secs {
            if !(t.is_finite() && t > 0.0) {
                return Err(NtpError::config(format!(
                    "timeout_secs must be a positive number, got {t}"
                )));
            }
        }
        if out.is_count_data {
            out.normalization = Normalization::QuantileLog2;
        }
        Ok(out)
    }

    pub fn threshold(&self) -> Option<Threshold> {
        self.p_value_threshold
            .map(Threshold::PValue)
            .or(self.fdr_threshold.map(Threshold::Fdr))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs_f64)
    }
}
