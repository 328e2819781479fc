use std::io::BufRead;
use std::path::Path;

use crate::input::{InputError, open_maybe_gz, split_tsv};
use crate::model::matrix::FeatureNamespace;
use crate::model::templates::TemplateSet;

const FEATURE_COLUMNS: &[&str] = &["feature", "probe", "gene", "id", "symbol", "entrez", "ensembl"];
const CLASS_COLUMNS: &[&str] = &["class", "template", "label", "subtype"];

/// Reads a long-format template table: one `(feature, class)` pair per line.
///
/// Class order follows first appearance in the file.
pub fn parse_templates_tsv(
    path: &Path,
    namespace: FeatureNamespace,
) -> Result<TemplateSet, InputError> {
    let mut reader = open_maybe_gz(path)?;
    let mut buf = String::new();

    buf.clear();
    if reader.read_line(&mut buf)? == 0 {
        return Err(InputError::Parse(format!(
            "template file {} is empty",
            path.display()
        )));
    }
    let header: Vec<String> = split_tsv(buf.trim_end_matches(['\n', '\r']))
        .into_iter()
        .map(|s| s.to_ascii_lowercase())
        .collect();

    let feature_col = find_column(&header, FEATURE_COLUMNS).ok_or_else(|| {
        InputError::Parse(format!(
            "template header must name a feature column (one of {})",
            FEATURE_COLUMNS.join(", ")
        ))
    })?;
    let class_col = find_column(&header, CLASS_COLUMNS).ok_or_else(|| {
        InputError::Parse(format!(
            "template header must name a class column (one of {})",
            CLASS_COLUMNS.join(", ")
        ))
    })?;

    let mut pairs = Vec::new();
    let mut line_no = 1usize;
    loop {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            break;
        }
        line_no += 1;
        let line = buf.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let fields = split_tsv(line);
        let feature = fields.get(feature_col).copied().unwrap_or("");
        let class = fields.get(class_col).copied().unwrap_or("");
        if feature.is_empty() || class.is_empty() {
            tracing::warn!(
                "template line {} is missing a feature or class; skipping",
                line_no
            );
            continue;
        }
        pairs.push((feature.to_string(), class.to_string()));
    }

    TemplateSet::from_pairs(namespace, pairs).map_err(|e| InputError::InvalidInput(e.to_string()))
}

fn find_column(header: &[String], names: &[&str]) -> Option<usize> {
    header.iter().position(|h| names.contains(&h.as_str()))
}
