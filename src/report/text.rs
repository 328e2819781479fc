use crate::report::{ClassStat, SummaryData, format_f64_6};

pub fn render_report_text(data: &SummaryData) -> String {
    let mut out = String::new();

    out.push_str("Nearest Template Prediction Report\n");
    out.push_str("==================================\n\n");

    out.push_str("1. Run\n");
    out.push_str(&format!(
        "Samples: {}\nFeatures: {} ({} used by templates, namespace {})\n",
        data.input.n_samples,
        data.input.n_features,
        data.input.n_template_features,
        data.input.namespace
    ));
    out.push_str(&format!("Preprocessing: {}\n", data.input.preprocessing));
    out.push_str(&format!(
        "Distance: {} | permutations: {} | seed: {} | workers: {}\n\n",
        data.config.distance_metric,
        data.config.n_perm,
        data.config.random_seed,
        data.config.worker_count
    ));

    out.push_str("2. Class assignment\n");
    for c in &data.classes {
        out.push_str(&format!(
            "{}: {} ({})\n",
            c.name,
            c.count,
            format_f64_6(c.fraction)
        ));
    }
    out.push_str(&format!(
        "{}: {} ({})\n",
        data.unassigned.name,
        data.unassigned.count,
        format_f64_6(data.unassigned.fraction)
    ));
    out.push_str(&format!("Dominant classes: {}\n\n", dominant_classes(&data.classes)));

    out.push_str("3. Significance\n");
    out.push_str(&format!(
        "Smallest attainable p-value: {}\n",
        format_f64_6(data.p_values.min_attainable)
    ));
    out.push_str(&format!(
        "p-value median: {} (p10 {}, p90 {})\n",
        format_f64_6(data.p_values.median),
        format_f64_6(data.p_values.p10),
        format_f64_6(data.p_values.p90)
    ));
    out.push_str(&format!(
        "p <= 0.05: {} | FDR <= 0.05: {} | FDR <= 0.10: {}\n",
        format_f64_6(data.p_values.p_le_0_05),
        format_f64_6(data.p_values.fdr_le_0_05),
        format_f64_6(data.p_values.fdr_le_0_10)
    ));
    out.push_str(&format!(
        "{}\n\n",
        signal_statement(data.p_values.fdr_le_0_05)
    ));

    out.push_str("4. Templates and caveats\n");
    for audit in &data.templates {
        out.push_str(&format!(
            "{}: {}/{} markers matched\n",
            audit.class_label, audit.markers_matched, audit.markers_defined
        ));
    }
    for (flag, count) in &data.flags {
        out.push_str(&format!("{}: {}\n", flag, count));
    }
    if data.input.n_samples < 40 {
        out.push_str(
            "Note: fewer than 40 samples; row scaling and FDR estimates are unreliable at this size.\n",
        );
    }

    out
}

fn dominant_classes(classes: &[ClassStat]) -> String {
    let mut sorted = classes.to_vec();
    sorted.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    sorted
        .iter()
        .take(2)
        .filter(|c| c.count > 0)
        .map(|c| format!("{} ({})", c.name, format_f64_6(c.fraction)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn signal_statement(fdr_fraction: f64) -> &'static str {
    if fdr_fraction >= 0.5 {
        "Most samples match a template well beyond chance."
    } else if fdr_fraction >= 0.1 {
        "A subset of samples matches a template beyond chance."
    } else {
        "Little evidence of template structure beyond chance."
    }
}
