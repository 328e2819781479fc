use crate::model::config::Threshold;
use crate::model::flags::{Flag, ordered_flags};
use crate::model::records::{Prediction, PredictionRecord};

/// Masks predictions whose p-value (or FDR) exceeds the threshold. Distances and
/// statistics are carried over untouched.
pub fn apply_threshold(records: &[PredictionRecord], threshold: Threshold) -> Vec<PredictionRecord> {
    records
        .iter()
        .map(|record| {
            let mut out = record.clone();
            let (value, limit) = match threshold {
                Threshold::PValue(t) => (record.p_value, t),
                Threshold::Fdr(t) => (record.adjusted_p_value, t),
            };
            if record.is_assigned() && value > limit {
                out.prediction = Prediction::Unassigned;
                out.flags.push(Flag::AboveThreshold);
                out.flags = ordered_flags(&out.flags);
            }
            out
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage7_threshold.rs"]
mod tests;
