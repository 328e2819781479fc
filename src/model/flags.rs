use serde::Serialize;

/// Per-sample diagnostics attached to prediction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Flag {
    /// Every class distance was undefined; the sample is unassigned.
    NoUsableTemplate,
    /// Some, but not all, class distances were undefined.
    PartialTemplates,
    /// The worker scoring this sample panicked or ran past the deadline.
    WorkerFailed,
    /// Masked to unassigned by the confidence threshold.
    AboveThreshold,
}

impl Flag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::NoUsableTemplate => "NO_USABLE_TEMPLATE",
            Flag::PartialTemplates => "PARTIAL_TEMPLATES",
            Flag::WorkerFailed => "WORKER_FAILED",
            Flag::AboveThreshold => "ABOVE_THRESHOLD",
        }
    }
}

pub fn flag_order() -> &'static [Flag] {
    &[
        Flag::NoUsableTemplate,
        Flag::PartialTemplates,
        Flag::WorkerFailed,
        Flag::AboveThreshold,
    ]
}

/// Deduplicates and puts flags in their stable reporting order.
pub fn ordered_flags(flags: &[Flag]) -> Vec<Flag> {
    let mut ordered = Vec::with_capacity(flags.len());
    for flag in flag_order() {
        if flags.contains(flag) {
            ordered.push(*flag);
        }
    }
    ordered
}
