use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use kira_ntp::input::{parse_matrix_tsv, parse_templates_tsv};
use kira_ntp::model::config::Normalization;
use kira_ntp::pipeline::run_ntp_with;
use kira_ntp::pipeline::stage1_preprocess::{
    FeatureStats, Preprocessor, Scaling, StandardPreprocessor, quantile_target,
};
use kira_ntp::pipeline::stage8_report::{ReportContext, write_reports};
use kira_ntp::{DistanceMetric, FeatureNamespace, NtpConfig, simd};

#[derive(Debug, Parser)]
#[command(
    name = "kira-ntp",
    version,
    about = "Nearest template prediction with permutation p-values"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Classify every sample of a matrix against a template set.
    Run(RunArgs),
    /// Compute per-feature reference statistics for single-sample scaling.
    ///
    /// With count data the cohort's quantile target is stored as well, so a
    /// later single-sample run is normalized onto the reference distribution.
    Stats(StatsArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Features x samples TSV(.gz).
    #[arg(long)]
    matrix: PathBuf,
    /// Two-column feature/class TSV(.gz).
    #[arg(long)]
    templates: PathBuf,
    #[arg(long)]
    out: PathBuf,
    /// JSON configuration; command-line options override its fields.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    metric: Option<DistanceMetric>,
    #[arg(long)]
    n_perm: Option<usize>,
    #[arg(long)]
    workers: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    count_data: bool,
    #[arg(long)]
    scale_rows: bool,
    #[arg(long)]
    normalization: Option<Normalization>,
    /// Reference feature statistics written by `kira-ntp stats`.
    #[arg(long)]
    reference_stats: Option<PathBuf>,
    #[arg(long, conflicts_with = "fdr_threshold")]
    p_threshold: Option<f64>,
    #[arg(long)]
    fdr_threshold: Option<f64>,
    #[arg(long)]
    timeout_secs: Option<f64>,
    #[arg(long)]
    namespace: Option<FeatureNamespace>,
}

#[derive(Debug, Args)]
struct StatsArgs {
    #[arg(long)]
    matrix: PathBuf,
    /// Output JSON path.
    #[arg(long)]
    out: PathBuf,
    #[arg(long, default_value = "symbol")]
    namespace: FeatureNamespace,
    #[arg(long)]
    count_data: bool,
    #[arg(long)]
    normalization: Option<Normalization>,
}

fn main() {
    kira_ntp::logging::init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run(args) => run(&args),
        Command::Stats(args) => stats(&args),
    };
    if let Err(err) = result {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run(args: &RunArgs) -> Result<(), String> {
    tracing::info!("SIMD backend: {}", simd::backend_name());
    let config = build_config(args)?;
    let resolved = config.resolve().map_err(|e| e.to_string())?;

    let matrix = parse_matrix_tsv(&args.matrix, resolved.namespace).map_err(|e| e.to_string())?;
    let templates =
        parse_templates_tsv(&args.templates, resolved.namespace).map_err(|e| e.to_string())?;
    let reference = match &args.reference_stats {
        Some(path) => Some(FeatureStats::load_json(path).map_err(|e| e.to_string())?),
        None => None,
    };

    let preprocessor = StandardPreprocessor::from_config(&resolved, reference);
    let result =
        run_ntp_with(&matrix, &templates, &resolved, &preprocessor).map_err(|e| e.to_string())?;

    let ctx = ReportContext {
        tool_name: "kira-ntp".to_string(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: read_git_hash(Path::new(".")),
        simd_backend: simd::backend_name().to_string(),
        namespace: resolved.namespace.to_string(),
    };
    write_reports(&result, &ctx, &args.out).map_err(|e| e.to_string())?;
    Ok(())
}

fn stats(args: &StatsArgs) -> Result<(), String> {
    let matrix = parse_matrix_tsv(&args.matrix, args.namespace).map_err(|e| e.to_string())?;
    let normalization = if args.count_data {
        Normalization::QuantileLog2
    } else {
        args.normalization.unwrap_or_default()
    };
    let preprocessor = StandardPreprocessor {
        normalization,
        scaling: Scaling::AssumeScaled,
    };
    let transformed = preprocessor.apply(&matrix).map_err(|e| e.to_string())?;
    let mut stats = FeatureStats::from_matrix(&transformed);
    if normalization == Normalization::QuantileLog2 {
        let target = quantile_target(matrix.values(), matrix.n_features());
        if target.iter().all(|v| v.is_finite()) {
            stats = stats.with_quantile_target(target);
        } else {
            tracing::warn!("matrix has no finite values; quantile target not stored");
        }
    }
    stats.write_json(&args.out).map_err(|e| e.to_string())?;
    tracing::info!(
        "wrote statistics for {} features ({}) to {}",
        stats.feature_ids.len(),
        preprocessor.name(),
        args.out.display()
    );
    Ok(())
}

/// Defaults, then the JSON file, then explicit command-line options.
fn build_config(args: &RunArgs) -> Result<NtpConfig, String> {
    let mut config = match &args.config {
        Some(path) => NtpConfig::from_json_file(path).map_err(|e| e.to_string())?,
        None => NtpConfig::default(),
    };
    if let Some(metric) = args.metric {
        config.distance_metric = metric;
    }
    if let Some(n_perm) = args.n_perm {
        config.n_perm = n_perm;
    }
    if let Some(workers) = args.workers {
        config.worker_count = workers;
    }
    if let Some(seed) = args.seed {
        config.random_seed = seed;
    }
    if args.count_data {
        config.is_count_data = true;
    }
    if args.scale_rows {
        config.scale_rows = true;
    }
    if let Some(normalization) = args.normalization {
        config.normalization = normalization;
    }
    if let Some(t) = args.p_threshold {
        config.p_value_threshold = Some(t);
        config.fdr_threshold = None;
    }
    if let Some(t) = args.fdr_threshold {
        config.fdr_threshold = Some(t);
        config.p_value_threshold = None;
    }
    if let Some(secs) = args.timeout_secs {
        config.timeout_secs = Some(secs);
    }
    if let Some(namespace) = args.namespace {
        config.namespace = namespace;
    }
    Ok(config)
}

fn read_git_hash(repo_root: &Path) -> Option<String> {
    let head = repo_root.join(".git/HEAD");
    let content = std::fs::read_to_string(head).ok()?;
    if let Some(ref_line) = content.strip_prefix("ref: ") {
        let ref_path = repo_root.join(".git").join(ref_line.trim());
        return std::fs::read_to_string(ref_path)
            .ok()
            .map(|s| s.trim().to_string());
    }
    Some(content.trim().to_string())
}

#[cfg(test)]
#[path = "../tests/src_inline/main_inline.rs"]
mod tests;
