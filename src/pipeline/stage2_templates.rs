use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::NtpError;
use crate::model::matrix::ExpressionMatrix;
use crate::model::templates::TemplateSet;

#[derive(Debug, Clone, Serialize)]
pub struct TemplateAudit {
    pub class_label: String,
    pub markers_defined: usize,
    pub markers_matched: usize,
    pub missing_markers: Vec<String>,
}

/// Templates mapped onto matrix rows.
///
/// The template feature space is the union of every class's matched markers, in
/// matrix row order. Each class is an indicator vector over that space, stored as
/// the list of its marker positions.
#[derive(Debug, Clone)]
pub struct ResolvedTemplates {
    pub labels: Vec<String>,
    /// Template-space position -> matrix row.
    pub feature_rows: Vec<usize>,
    /// Per class, marker positions within the template space (ascending).
    pub class_markers: Vec<Vec<usize>>,
    pub audits: Vec<TemplateAudit>,
}

impl ResolvedTemplates {
    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }

    pub fn n_features(&self) -> usize {
        self.feature_rows.len()
    }

    /// Indicator vector of class `k` over the template space.
    pub fn indicator(&self, k: usize) -> Vec<f64> {
        let mut y = vec![0f64; self.n_features()];
        for &p in &self.class_markers[k] {
            y[p] = 1.0;
        }
        y
    }
}

/// Maps markers onto the matrix. Unmatched markers are dropped and audited; a
/// class with no matched marker is a configuration error.
pub fn resolve_templates(
    matrix: &ExpressionMatrix,
    templates: &TemplateSet,
) -> Result<ResolvedTemplates, NtpError> {
    if templates.is_empty() {
        return Err(NtpError::config("template set is empty"));
    }
    if matrix.n_features() == 0 || matrix.n_samples() == 0 {
        return Err(NtpError::config("expression matrix is empty"));
    }
    if matrix.namespace() != templates.namespace() {
        return Err(NtpError::config(format!(
            "template namespace {} does not match matrix namespace {}",
            templates.namespace(),
            matrix.namespace()
        )));
    }

    let index = matrix.feature_index();
    let mut rows_per_class: Vec<Vec<usize>> = Vec::with_capacity(templates.len());
    let mut audits = Vec::with_capacity(templates.len());
    let mut union = BTreeSet::new();

    for class in templates.classes() {
        let mut rows = Vec::new();
        let mut missing = Vec::new();
        for marker in &class.markers {
            match index.get(marker.as_str()) {
                Some(&row) => rows.push(row),
                None => missing.push(marker.clone()),
            }
        }
        if rows.is_empty() {
            return Err(NtpError::config(format!(
                "template class {} has no markers among the {} matrix features",
                class.label,
                matrix.n_features()
            )));
        }
        if !missing.is_empty() {
            tracing::debug!(
                "class {}: {} of {} markers not found in matrix",
                class.label,
                missing.len(),
                class.markers.len()
            );
        }
        union.extend(rows.iter().copied());
        audits.push(TemplateAudit {
            class_label: class.label.clone(),
            markers_defined: class.markers.len(),
            markers_matched: rows.len(),
            missing_markers: missing,
        });
        rows_per_class.push(rows);
    }

    let feature_rows: Vec<usize> = union.into_iter().collect();
    let mut position_of_row = vec![usize::MAX; matrix.n_features()];
    for (pos, &row) in feature_rows.iter().enumerate() {
        position_of_row[row] = pos;
    }
    let class_markers = rows_per_class
        .into_iter()
        .map(|rows| {
            let mut positions: Vec<usize> = rows.iter().map(|&r| position_of_row[r]).collect();
            positions.sort_unstable();
            positions
        })
        .collect();

    tracing::info!(
        "resolved {} templates over {} template features",
        templates.len(),
        feature_rows.len()
    );

    Ok(ResolvedTemplates {
        labels: templates.labels(),
        feature_rows,
        class_markers,
        audits,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage2_templates.rs"]
mod tests;
