use std::io::BufRead;
use std::path::Path;

use crate::input::{InputError, open_maybe_gz, parse_value, split_tsv};
use crate::model::matrix::{ExpressionMatrix, FeatureNamespace};

/// Reads a features x samples TSV (optionally gzipped).
///
/// The header names the samples. Both layouts are accepted: a header with a corner
/// cell (`id<TAB>s1<TAB>s2`) and one without (`s1<TAB>s2`, as written by R).
pub fn parse_matrix_tsv(
    path: &Path,
    namespace: FeatureNamespace,
) -> Result<ExpressionMatrix, InputError> {
    let mut reader = open_maybe_gz(path)?;
    let mut buf = String::new();
    let mut line_no = 0usize;

    let header: Vec<String> = loop {
        buf.clear();
        let read = reader.read_line(&mut buf)?;
        if read == 0 {
            return Err(InputError::Parse(format!(
                "matrix file {} is empty",
                path.display()
            )));
        }
        line_no += 1;
        let line = buf.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        break split_tsv(line).into_iter().map(str::to_string).collect();
    };

    let mut sample_ids: Option<Vec<String>> = None;
    let mut feature_ids = Vec::new();
    let mut rows: Vec<Vec<f64>> = Vec::new();

    loop {
        buf.clear();
        let read = reader.read_line(&mut buf)?;
        if read == 0 {
            break;
        }
        line_no += 1;
        let line = buf.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let fields = split_tsv(line);

        if sample_ids.is_none() {
            let resolved = if fields.len() == header.len() + 1 {
                header.clone()
            } else if fields.len() == header.len() {
                header[1..].to_vec()
            } else {
                return Err(InputError::Parse(format!(
                    "matrix line {} has {} columns but header has {}",
                    line_no,
                    fields.len(),
                    header.len()
                )));
            };
            sample_ids = Some(resolved);
        }
        let n_samples = sample_ids.as_ref().map(Vec::len).unwrap_or(0);

        if fields.len() != n_samples + 1 {
            return Err(InputError::Parse(format!(
                "matrix line {} has {} columns, expected {}",
                line_no,
                fields.len(),
                n_samples + 1
            )));
        }

        let mut row = Vec::with_capacity(n_samples);
        for (col, raw) in fields[1..].iter().enumerate() {
            let value = parse_value(raw).ok_or_else(|| {
                InputError::Parse(format!(
                    "invalid value {:?} at line {}, column {}",
                    raw,
                    line_no,
                    col + 2
                ))
            })?;
            row.push(value);
        }
        feature_ids.push(fields[0].to_string());
        rows.push(row);
    }

    let sample_ids = sample_ids.unwrap_or_else(|| header.get(1..).unwrap_or_default().to_vec());
    tracing::info!(
        "loaded matrix {}: {} features x {} samples",
        path.display(),
        feature_ids.len(),
        sample_ids.len()
    );

    ExpressionMatrix::from_rows(namespace, feature_ids, sample_ids, rows)
        .map_err(|e| InputError::InvalidInput(e.to_string()))
}
