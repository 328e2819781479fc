//! Nearest template prediction (NTP) for expression profiles.
//!
//! Each sample is assigned to the class whose marker template is nearest under a
//! correlation distance `sqrt(0.5 * (1 - f))`. Significance comes from a per-sample
//! feature-label permutation test, followed by Benjamini-Hochberg adjustment across
//! samples.

pub mod error;
pub mod input;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod simd;

pub use error::NtpError;
pub use model::config::{DistanceMetric, NtpConfig, Threshold};
pub use model::matrix::{ExpressionMatrix, FeatureNamespace};
pub use model::records::{DistanceMatrix, Prediction, PredictionRecord};
pub use model::templates::TemplateSet;
pub use pipeline::{NtpResult, run_ntp, run_ntp_with};
