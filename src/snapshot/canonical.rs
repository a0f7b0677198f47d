//! Canonical label serialization
//!
//! Snapshots store labels as a compact JSON object with keys sorted, e.g.
//! `{"env":"dev","team":"core"}`. The same labels always give the same string.

use crate::models::{GceResource, LabelMapping, ResourceSnapshot};
use serde_json::{Map, Value};

pub fn canonical_label_hash(labels: &LabelMapping) -> String {
    let object: Map<String, Value> = labels
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    Value::Object(object).to_string()
}

/// Recover labels from a stored hash. `None` when the hash is not a flat string map.
pub fn parse_label_hash(hash: &str) -> Option<LabelMapping> {
    serde_json::from_str(hash).ok()
}

impl ResourceSnapshot {
    /// Capture the drift-relevant fields of a resource as they are now
    pub fn capture(resource: &GceResource) -> Self {
        Self {
            id: resource.id.clone(),
            name: resource.name.clone(),
            resource_type: resource.resource_type,
            status: resource.status.clone(),
            zone: resource.zone.clone(),
            label_hash: canonical_label_hash(&resource.labels),
            meta: None,
        }
    }
}
