use crate::model::matrix::FeatureNamespace;

/// Canonical form of a feature identifier within its namespace.
///
/// Symbols are upper-cased, Ensembl identifiers lose their `.N` version suffix and
/// Entrez identifiers lose a trailing `.0` left behind by spreadsheet exports.
pub fn normalize_feature_id(namespace: FeatureNamespace, raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('"');
    if trimmed.is_empty() {
        return String::new();
    }
    match namespace {
        FeatureNamespace::Symbol => trimmed.to_ascii_uppercase(),
        FeatureNamespace::Ensembl => {
            let upper = trimmed.to_ascii_uppercase();
            if let Some((left, right)) = upper.rsplit_once('.') {
                if left.starts_with("ENS") && right.chars().all(|c| c.is_ascii_digit()) {
                    return left.to_string();
                }
            }
            upper
        }
        FeatureNamespace::Entrez => {
            let id = trimmed.strip_suffix(".0").unwrap_or(trimmed);
            id.to_string()
        }
    }
}
