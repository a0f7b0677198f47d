//! Label mapping and label deltas

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key/value labels attached to a resource.
///
/// A `BTreeMap` keeps keys unique and iteration sorted, so equality is
/// key/value-set equality and serialization is canonical.
pub type LabelMapping = BTreeMap<String, String>;

/// Keys that differ between two label mappings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDelta {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
}

impl LabelDelta {
    /// Compare `before` with `after`. Each list comes out sorted.
    pub fn between(before: &LabelMapping, after: &LabelMapping) -> Self {
        let mut delta = LabelDelta::default();

        for (key, value) in after {
            match before.get(key) {
                None => delta.added.push(key.clone()),
                Some(old) if old != value => delta.changed.push(key.clone()),
                Some(_) => {}
            }
        }

        delta.removed = before
            .keys()
            .filter(|key| !after.contains_key(*key))
            .cloned()
            .collect();

        delta
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// Human-readable form, e.g. `added [team]; changed [env]`
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if !self.added.is_empty() {
            parts.push(format!("added [{}]", self.added.join(", ")));
        }
        if !self.removed.is_empty() {
            parts.push(format!("removed [{}]", self.removed.join(", ")));
        }
        if !self.changed.is_empty() {
            parts.push(format!("changed [{}]", self.changed.join(", ")));
        }
        parts.join("; ")
    }
}
