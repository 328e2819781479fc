use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::error::NtpError;
use crate::input::features::normalize_feature_id;
use crate::model::matrix::FeatureNamespace;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateClass {
    pub label: String,
    /// Normalized marker identifiers, first-seen order, no duplicates.
    pub markers: Vec<String>,
}

/// Ordered set of class templates, validated at construction.
///
/// Class order is significant: it fixes the distance column order and breaks
/// ties in nearest-template assignment (lowest index wins).
#[derive(Debug, Clone, Serialize)]
pub struct TemplateSet {
    namespace: FeatureNamespace,
    classes: Vec<TemplateClass>,
}

impl TemplateSet {
    pub fn new<I, M, S>(namespace: FeatureNamespace, classes: I) -> Result<Self, NtpError>
    where
        I: IntoIterator<Item = (S, M)>,
        M: IntoIterator,
        M::Item: AsRef<str>,
        S: Into<String>,
    {
        let mut out = Vec::new();
        let mut labels = HashSet::new();
        for (label, markers) in classes {
            let label: String = label.into();
            let label = label.trim().to_string();
            if label.is_empty() {
                return Err(NtpError::config("template class with an empty label"));
            }
            if !labels.insert(label.clone()) {
                return Err(NtpError::config(format!(
                    "duplicate template class {label}"
                )));
            }
            let mut seen = BTreeSet::new();
            let mut ids = Vec::new();
            for raw in markers {
                let id = normalize_feature_id(namespace, raw.as_ref());
                if id.is_empty() {
                    continue;
                }
                if seen.insert(id.clone()) {
                    ids.push(id);
                }
            }
            if ids.is_empty() {
                return Err(NtpError::config(format!(
                    "template class {label} has no markers"
                )));
            }
            out.push(TemplateClass {
                label,
                markers: ids,
            });
        }
        if out.is_empty() {
            return Err(NtpError::config("template set is empty"));
        }
        Ok(Self {
            namespace,
            classes: out,
        })
    }

    /// Groups long-format `(feature, class)` pairs; classes keep first-appearance order.
    pub fn from_pairs<I>(namespace: FeatureNamespace, pairs: I) -> Result<Self, NtpError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
        for (feature, class) in pairs {
            let class = class.trim().to_string();
            match grouped.iter_mut().find(|(label, _)| *label == class) {
                Some((_, markers)) => markers.push(feature),
                None => grouped.push((class, vec![feature])),
            }
        }
        Self::new(namespace, grouped)
    }

    pub fn namespace(&self) -> FeatureNamespace {
        self.namespace
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn classes(&self) -> &[TemplateClass] {
        &self.classes
    }

    pub fn labels(&self) -> Vec<String> {
        self.classes.iter().map(|c| c.label.clone()).collect()
    }
}
