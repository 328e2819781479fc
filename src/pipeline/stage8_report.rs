use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::model::flags::flag_order;
use crate::model::records::{Prediction, UNASSIGNED_LABEL};
use crate::pipeline::NtpResult;
use crate::report::json::{render_predictions_json, render_summary_json};
use crate::report::text::render_report_text;
use crate::report::{
    ClassStat, InputMeta, PValueStats, SummaryData, ToolMeta, format_f64_6, fraction_le,
    mean_finite, median, p10, p90,
};

pub const PREDICTIONS_TSV: &str = "predictions.tsv";
pub const PREDICTIONS_JSON: &str = "predictions.json";
pub const SUMMARY_JSON: &str = "summary.json";
pub const REPORT_TXT: &str = "report.txt";
pub const TEMPLATES_TSV: &str = "templates_report.tsv";

/// Run metadata that does not come from the engine itself.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub tool_name: String,
    pub tool_version: String,
    pub git_hash: Option<String>,
    pub simd_backend: String,
    pub namespace: String,
}

pub fn write_reports(
    result: &NtpResult,
    ctx: &ReportContext,
    out_dir: &Path,
) -> std::io::Result<()> {
    fs::create_dir_all(out_dir)?;

    write_predictions_tsv(result, &out_dir.join(PREDICTIONS_TSV))?;

    let predictions = render_predictions_json(&result.labels, &result.records)
        .map_err(std::io::Error::other)?;
    write_text(&out_dir.join(PREDICTIONS_JSON), &predictions)?;

    let summary = build_summary(result, ctx);
    let json = render_summary_json(&summary).map_err(std::io::Error::other)?;
    write_text(&out_dir.join(SUMMARY_JSON), &json)?;

    write_text(&out_dir.join(REPORT_TXT), &render_report_text(&summary))?;

    write_templates_report(result, &out_dir.join(TEMPLATES_TSV))?;

    tracing::info!("reports written to {}", out_dir.display());
    Ok(())
}

fn write_predictions_tsv(result: &NtpResult, path: &Path) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    let mut header = vec!["sample_id".to_string(), "prediction".to_string()];
    header.extend(result.labels.iter().map(|l| format!("d.{l}")));
    header.extend(["p_value", "fdr", "flags"].map(String::from));
    writeln!(w, "{}", header.join("\t"))?;

    for record in &result.records {
        let mut fields = Vec::with_capacity(header.len());
        fields.push(record.sample_id.clone());
        fields.push(record.prediction.label(&result.labels).to_string());
        fields.extend(record.distances.iter().map(|&d| format_f64_6(d)));
        fields.push(format_f64_6(record.p_value));
        fields.push(format_f64_6(record.adjusted_p_value));
        fields.push(
            record
                .flags
                .iter()
                .map(|f| f.as_str())
                .collect::<Vec<_>>()
                .join(","),
        );
        writeln!(w, "{}", fields.join("\t"))?;
    }
    w.flush()
}

fn write_templates_report(result: &NtpResult, path: &Path) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    writeln!(
        w,
        "class\tmarkers_defined\tmarkers_matched\tmissing_markers\tassigned\tdistance_median"
    )?;
    for (k, audit) in result.audits.iter().enumerate() {
        let assigned = result
            .records
            .iter()
            .filter(|r| r.prediction == Prediction::Class(k))
            .count();
        let column: Vec<f64> = (0..result.distances.n_samples())
            .map(|s| result.distances.get(s, k))
            .collect();
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}",
            audit.class_label,
            audit.markers_defined,
            audit.markers_matched,
            audit.missing_markers.join(","),
            assigned,
            format_f64_6(median(&column))
        )?;
    }
    w.flush()
}

pub fn build_summary(result: &NtpResult, ctx: &ReportContext) -> SummaryData {
    let n = result.records.len();
    let fraction = |count: usize| {
        if n == 0 { 0.0 } else { count as f64 / n as f64 }
    };

    let mut counts = vec![0usize; result.labels.len()];
    let mut unassigned = 0usize;
    for record in &result.records {
        match record.prediction {
            Prediction::Class(k) => counts[k] += 1,
            Prediction::Unassigned => unassigned += 1,
        }
    }
    let classes = result
        .labels
        .iter()
        .zip(&counts)
        .map(|(name, &count)| ClassStat {
            name: name.clone(),
            count,
            fraction: fraction(count),
        })
        .collect();

    let p_values: Vec<f64> = result.records.iter().map(|r| r.p_value).collect();
    let fdr: Vec<f64> = result.records.iter().map(|r| r.adjusted_p_value).collect();
    let winning: Vec<f64> = result
        .records
        .iter()
        .filter_map(|r| {
            let k = r.prediction.class_index()?;
            r.distances.get(k).copied()
        })
        .collect();

    let mut flags = BTreeMap::new();
    for flag in flag_order() {
        let count = result
            .records
            .iter()
            .filter(|r| r.flags.contains(flag))
            .count();
        flags.insert(flag.as_str().to_string(), count);
    }

    SummaryData {
        tool: ToolMeta {
            name: ctx.tool_name.clone(),
            version: ctx.tool_version.clone(),
            git_hash: ctx.git_hash.clone(),
            simd_backend: ctx.simd_backend.clone(),
        },
        input: InputMeta {
            n_samples: n,
            n_features: result.n_features,
            n_template_features: result.n_template_features,
            namespace: ctx.namespace.clone(),
            preprocessing: result.preprocessing.clone(),
        },
        config: result.config.clone(),
        classes,
        unassigned: ClassStat {
            name: UNASSIGNED_LABEL.to_string(),
            count: unassigned,
            fraction: fraction(unassigned),
        },
        p_values: PValueStats {
            min_attainable: 1.0 / result.config.n_perm as f64,
            median: median(&p_values),
            p10: p10(&p_values),
            p90: p90(&p_values),
            p_le_0_05: fraction_le(&p_values, 0.05),
            fdr_le_0_05: fraction_le(&fdr, 0.05),
            fdr_le_0_10: fraction_le(&fdr, 0.10),
        },
        winning_distance_median: median(&winning),
        distance_mean: mean_finite(result.distances.values()),
        flags,
        templates: result.audits.clone(),
    }
}

fn write_text(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(contents.as_bytes())?;
    w.flush()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage8_report.rs"]
mod tests;
