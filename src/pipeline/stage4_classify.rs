use crate::model::flags::Flag;
use crate::model::records::{DistanceMatrix, Prediction};

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub prediction: Prediction,
    /// Winning distance, NaN when unassigned.
    pub distance: f64,
    pub flags: Vec<Flag>,
}

/// Index and value of the smallest non-NaN distance. Ties go to the lowest index.
pub fn nearest_template(distances: &[f64]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (k, &d) in distances.iter().enumerate() {
        if d.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if d >= b => {}
            _ => best = Some((k, d)),
        }
    }
    best
}

pub fn classify_sample(distances: &[f64]) -> Classification {
    let n_nan = distances.iter().filter(|d| d.is_nan()).count();
    match nearest_template(distances) {
        Some((k, d)) => {
            let mut flags = Vec::new();
            if n_nan > 0 {
                flags.push(Flag::PartialTemplates);
            }
            Classification {
                prediction: Prediction::Class(k),
                distance: d,
                flags,
            }
        }
        None => Classification {
            prediction: Prediction::Unassigned,
            distance: f64::NAN,
            flags: vec![Flag::NoUsableTemplate],
        },
    }
}

pub fn run_stage4(distances: &DistanceMatrix) -> Vec<Classification> {
    (0..distances.n_samples())
        .map(|s| classify_sample(distances.row(s)))
        .collect()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage4_classify.rs"]
mod tests;
