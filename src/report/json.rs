use serde::Serialize;

use crate::model::flags::Flag;
use crate::model::records::PredictionRecord;
use crate::report::SummaryData;

/// Pretty JSON; non-finite numbers are written as `null`.
pub fn render_summary_json(data: &SummaryData) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(data)
}

#[derive(Debug, Serialize)]
struct ClassDistance<'a> {
    class: &'a str,
    distance: f64,
}

#[derive(Debug, Serialize)]
struct RecordJson<'a> {
    sample_id: &'a str,
    prediction: &'a str,
    /// Template order, matching the `d.<class>` columns of the TSV.
    distances: Vec<ClassDistance<'a>>,
    p_value: f64,
    fdr: f64,
    flags: &'a [Flag],
}

/// One object per sample, in input order, with class labels resolved.
pub fn render_predictions_json(
    labels: &[String],
    records: &[PredictionRecord],
) -> Result<String, serde_json::Error> {
    let rows: Vec<RecordJson<'_>> = records
        .iter()
        .map(|r| RecordJson {
            sample_id: &r.sample_id,
            prediction: r.prediction.label(labels),
            distances: labels
                .iter()
                .zip(r.distances.iter().copied())
                .map(|(class, distance)| ClassDistance { class, distance })
                .collect(),
            p_value: r.p_value,
            fdr: r.adjusted_p_value,
            flags: &r.flags,
        })
        .collect();
    serde_json::to_string_pretty(&rows)
}
