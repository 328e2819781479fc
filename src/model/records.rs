use serde::Serialize;

use crate::model::flags::Flag;

pub const UNASSIGNED_LABEL: &str = "unassigned";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Prediction {
    /// Index into the template set's class order.
    Class(usize),
    Unassigned,
}

impl Prediction {
    pub fn class_index(&self) -> Option<usize> {
        match self {
            Prediction::Class(k) => Some(*k),
            Prediction::Unassigned => None,
        }
    }

    pub fn label<'a>(&self, labels: &'a [String]) -> &'a str {
        match self {
            Prediction::Class(k) => labels.get(*k).map(String::as_str).unwrap_or(UNASSIGNED_LABEL),
            Prediction::Unassigned => UNASSIGNED_LABEL,
        }
    }
}

/// N x K sample/class distances, one row per sample in input order.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    n_samples: usize,
    n_classes: usize,
    values: Vec<f64>,
}

impl DistanceMatrix {
    pub fn from_rows(n_classes: usize, rows: &[Vec<f64>]) -> Self {
        let mut values = Vec::with_capacity(rows.len() * n_classes);
        for row in rows {
            debug_assert_eq!(row.len(), n_classes);
            values.extend_from_slice(row);
        }
        Self {
            n_samples: rows.len(),
            n_classes,
            values,
        }
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn row(&self, sample: usize) -> &[f64] {
        &self.values[sample * self.n_classes..(sample + 1) * self.n_classes]
    }

    pub fn get(&self, sample: usize, class: usize) -> f64 {
        self.values[sample * self.n_classes + class]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionRecord {
    pub sample_id: String,
    pub prediction: Prediction,
    pub distances: Vec<f64>,
    pub p_value: f64,
    pub adjusted_p_value: f64,
    pub flags: Vec<Flag>,
}

impl PredictionRecord {
    pub fn is_assigned(&self) -> bool {
        matches!(self.prediction, Prediction::Class(_))
    }
}
