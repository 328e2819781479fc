pub mod stage1_preprocess;
pub mod stage2_templates;
pub mod stage3_distance;
pub mod stage4_classify;
pub mod stage5_permutation;
pub mod stage6_fdr;
pub mod stage7_threshold;
pub mod stage8_report;
pub mod workers;

use crate::error::NtpError;
use crate::model::config::NtpConfig;
use crate::model::flags::{Flag, ordered_flags};
use crate::model::matrix::ExpressionMatrix;
use crate::model::records::{DistanceMatrix, Prediction, PredictionRecord};
use crate::model::templates::TemplateSet;
use stage1_preprocess::{Preprocessor, StandardPreprocessor};
use stage2_templates::{TemplateAudit, resolve_templates};
use stage3_distance::DistanceEngine;
use stage4_classify::{nearest_template, run_stage4};
use stage5_permutation::PermutationTester;
use stage6_fdr::benjamini_hochberg;
use stage7_threshold::apply_threshold;
use workers::{Deadline, SampleMapper, SampleOutcome, SerialMapper, ThreadPoolMapper};

#[derive(Debug, Clone)]
pub struct NtpResult {
    pub labels: Vec<String>,
    pub distances: DistanceMatrix,
    pub records: Vec<PredictionRecord>,
    pub audits: Vec<TemplateAudit>,
    /// Effective configuration after validation.
    pub config: NtpConfig,
    pub preprocessing: String,
    pub n_features: usize,
    pub n_template_features: usize,
}

#[derive(Debug, Clone)]
struct SampleScore {
    distances: Vec<f64>,
    p_value: f64,
}

/// Runs NTP with the preprocessing implied by `config`.
pub fn run_ntp(
    matrix: &ExpressionMatrix,
    templates: &TemplateSet,
    config: &NtpConfig,
) -> Result<NtpResult, NtpError> {
    let resolved = config.resolve()?;
    let preprocessor = StandardPreprocessor::from_config(&resolved, None);
    run_ntp_with(matrix, templates, &resolved, &preprocessor)
}

/// Runs NTP with a caller-supplied preprocessing step.
///
/// Configuration problems (invalid options, unusable templates, empty inputs) fail
/// here before any sample is scored. Per-sample problems are reported in the
/// records instead.
pub fn run_ntp_with(
    matrix: &ExpressionMatrix,
    templates: &TemplateSet,
    config: &NtpConfig,
    preprocessor: &dyn Preprocessor,
) -> Result<NtpResult, NtpError> {
    let config = config.resolve()?;
    let resolved = resolve_templates(matrix, templates)?;
    let n_template_features = resolved.n_features();
    let audits = resolved.audits.clone();
    let labels = resolved.labels.clone();

    let scaled = preprocessor.apply(matrix)?;
    let n_samples = scaled.n_samples();
    let n_classes = labels.len();

    tracing::info!(
        "scoring {} samples against {} templates: metric={}, n_perm={}, workers={}, preprocessing={}",
        n_samples,
        n_classes,
        config.distance_metric,
        config.n_perm,
        config.worker_count,
        preprocessor.name()
    );

    let engine = DistanceEngine::new(config.distance_metric, resolved);
    let tester = PermutationTester::new(&engine, config.n_perm, config.random_seed);
    let task = |sample: usize, deadline: &Deadline| {
        let profile = engine.profile(scaled.column(sample));
        let distances = engine.distances(&profile);
        let p_value = match nearest_template(&distances) {
            Some((_, observed)) => tester.p_value(&profile, sample, observed, deadline)?,
            None => f64::NAN,
        };
        Some(SampleScore { distances, p_value })
    };

    let outcomes = if config.worker_count > 1 {
        let mapper = ThreadPoolMapper::new(config.worker_count, config.timeout())?;
        mapper.map(n_samples, &task)
    } else {
        SerialMapper::new(config.timeout()).map(n_samples, &task)
    };

    let mut rows = Vec::with_capacity(n_samples);
    let mut p_values = Vec::with_capacity(n_samples);
    let mut failed = vec![false; n_samples];
    for (sample, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            SampleOutcome::Done(score) => {
                rows.push(score.distances);
                p_values.push(score.p_value);
            }
            SampleOutcome::Failed(reason) => {
                tracing::warn!(
                    "sample {} degraded to unassigned: {:?}",
                    scaled.sample_ids()[sample],
                    reason
                );
                failed[sample] = true;
                rows.push(vec![f64::NAN; n_classes]);
                p_values.push(f64::NAN);
            }
        }
    }

    let distances = DistanceMatrix::from_rows(n_classes, &rows);
    let classifications = run_stage4(&distances);
    let adjusted = benjamini_hochberg(&p_values);

    let mut records = Vec::with_capacity(n_samples);
    for (sample, class) in classifications.into_iter().enumerate() {
        let flags = if failed[sample] {
            vec![Flag::WorkerFailed]
        } else {
            ordered_flags(&class.flags)
        };
        let prediction = if failed[sample] {
            Prediction::Unassigned
        } else {
            class.prediction
        };
        records.push(PredictionRecord {
            sample_id: scaled.sample_ids()[sample].clone(),
            prediction,
            distances: distances.row(sample).to_vec(),
            p_value: p_values[sample],
            adjusted_p_value: adjusted[sample],
            flags,
        });
    }

    if let Some(threshold) = config.threshold() {
        records = apply_threshold(&records, threshold);
    }

    let assigned = records.iter().filter(|r| r.is_assigned()).count();
    tracing::info!("assigned {} of {} samples", assigned, n_samples);

    Ok(NtpResult {
        labels,
        distances,
        records,
        audits,
        config,
        preprocessing: preprocessor.name(),
        n_features: matrix.n_features(),
        n_template_features,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/mod.rs"]
mod tests;
