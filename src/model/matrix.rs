use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NtpError;
use crate::input::features::normalize_feature_id;

/// Identifier system shared by matrix rows and template markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureNamespace {
    Entrez,
    Ensembl,
    #[default]
    Symbol,
}

impl FeatureNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureNamespace::Entrez => "entrez",
            FeatureNamespace::Ensembl => "ensembl",
            FeatureNamespace::Symbol => "symbol",
        }
    }
}

impl fmt::Display for FeatureNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureNamespace {
    type Err = NtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "entrez" => Ok(FeatureNamespace::Entrez),
            "ensembl" => Ok(FeatureNamespace::Ensembl),
            "symbol" => Ok(FeatureNamespace::Symbol),
            other => Err(NtpError::config(format!(
                "unknown feature namespace {other:?} (use entrez|ensembl|symbol)"
            ))),
        }
    }
}

/// Dense features x samples matrix. Values are stored sample-major so that a
/// sample's profile is one contiguous slice. Missing values are NaN.
#[derive(Debug, Clone)]
pub struct ExpressionMatrix {
    namespace: FeatureNamespace,
    feature_ids: Vec<String>,
    sample_ids: Vec<String>,
    values: Vec<f64>,
}

impl ExpressionMatrix {
    /// Builds a matrix from one vector per feature (row).
    pub fn from_rows(
        namespace: FeatureNamespace,
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, NtpError> {
        let n_features = feature_ids.len();
        let n_samples = sample_ids.len();
        if rows.len() != n_features {
            return Err(NtpError::config(format!(
                "matrix has {} rows but {} feature identifiers",
                rows.len(),
                n_features
            )));
        }
        let mut values = vec![f64::NAN; n_features * n_samples];
        for (f, row) in rows.iter().enumerate() {
            if row.len() != n_samples {
                return Err(NtpError::config(format!(
                    "matrix row {} has {} values, expected {}",
                    feature_ids[f],
                    row.len(),
                    n_samples
                )));
            }
            for (s, &v) in row.iter().enumerate() {
                values[s * n_features + f] = v;
            }
        }
        Self::from_sample_major(namespace, feature_ids, sample_ids, values)
    }

    /// Builds a matrix from one vector per sample (column).
    pub fn from_columns(
        namespace: FeatureNamespace,
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
        columns: Vec<Vec<f64>>,
    ) -> Result<Self, NtpError> {
        let n_features = feature_ids.len();
        if columns.len() != sample_ids.len() {
            return Err(NtpError::config(format!(
                "matrix has {} columns but {} sample identifiers",
                columns.len(),
                sample_ids.len()
            )));
        }
        let mut values = Vec::with_capacity(n_features * columns.len());
        for (s, col) in columns.iter().enumerate() {
            if col.len() != n_features {
                return Err(NtpError::config(format!(
                    "sample {} has {} values, expected {}",
                    sample_ids[s],
                    col.len(),
                    n_features
                )));
            }
            values.extend_from_slice(col);
        }
        Self::from_sample_major(namespace, feature_ids, sample_ids, values)
    }

    fn from_sample_major(
        namespace: FeatureNamespace,
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
        values: Vec<f64>,
    ) -> Result<Self, NtpError> {
        if feature_ids.is_empty() || sample_ids.is_empty() {
            return Err(NtpError::config(format!(
                "expression matrix is empty ({} features x {} samples)",
                feature_ids.len(),
                sample_ids.len()
            )));
        }

        let mut normalized = Vec::with_capacity(feature_ids.len());
        let mut seen: HashMap<String, usize> = HashMap::with_capacity(feature_ids.len());
        for (idx, raw) in feature_ids.iter().enumerate() {
            let id = normalize_feature_id(namespace, raw);
            if id.is_empty() {
                return Err(NtpError::config(format!(
                    "feature at row {} has an empty identifier",
                    idx + 1
                )));
            }
            if let Some(first) = seen.insert(id.clone(), idx) {
                return Err(NtpError::config(format!(
                    "duplicate feature identifier {id} (rows {} and {})",
                    first + 1,
                    idx + 1
                )));
            }
            normalized.push(id);
        }

        let mut sample_seen = HashMap::with_capacity(sample_ids.len());
        for (idx, id) in sample_ids.iter().enumerate() {
            if let Some(first) = sample_seen.insert(id.as_str(), idx) {
                return Err(NtpError::config(format!(
                    "duplicate sample identifier {id} (columns {} and {})",
                    first + 1,
                    idx + 1
                )));
            }
        }

        Ok(Self {
            namespace,
            feature_ids: normalized,
            sample_ids,
            values,
        })
    }

    /// Same shape and identifiers, new values (sample-major).
    pub(crate) fn with_values(&self, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), self.values.len());
        Self {
            namespace: self.namespace,
            feature_ids: self.feature_ids.clone(),
            sample_ids: self.sample_ids.clone(),
            values,
        }
    }

    pub fn namespace(&self) -> FeatureNamespace {
        self.namespace
    }

    pub fn n_features(&self) -> usize {
        self.feature_ids.len()
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn column(&self, sample: usize) -> &[f64] {
        let n = self.n_features();
        &self.values[sample * n..(sample + 1) * n]
    }

    pub fn get(&self, feature: usize, sample: usize) -> f64 {
        self.values[sample * self.n_features() + feature]
    }

    pub fn row(&self, feature: usize) -> Vec<f64> {
        (0..self.n_samples()).map(|s| self.get(feature, s)).collect()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn feature_index(&self) -> HashMap<&str, usize> {
        self.feature_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect()
    }
}
