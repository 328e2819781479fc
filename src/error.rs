use thiserror::Error;

use crate::input::InputError;

/// Failures that abort a whole invocation before any sample is scored.
///
/// Per-sample degeneracies never surface here; they are encoded in the
/// prediction records as `Unassigned` with NaN statistics.
#[derive(Debug, Error)]
pub enum NtpError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("worker pool error: {0}")]
    WorkerPool(String),
}

impl NtpError {
    pub fn config(msg: impl Into<String>) -> Self {
        NtpError::Config(msg.into())
    }
}
