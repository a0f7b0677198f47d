//! Partial-success results for multi-resource evaluation

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A resource that could not be evaluated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceFailure {
    pub id: String,
    pub reason: String,
}

/// Per-resource outcomes of a batch. Keyed by id; position carries no meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome<T> {
    pub succeeded: Vec<String>,
    pub failed: Vec<ResourceFailure>,
    pub results: BTreeMap<String, T>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            results: BTreeMap::new(),
        }
    }
}

impl<T> BatchOutcome<T> {
    pub fn record(&mut self, id: impl Into<String>, outcome: Result<T, EngineError>) {
        let id = id.into();
        match outcome {
            Ok(value) => {
                self.results.insert(id, value);
            }
            Err(err) => self.fail(id, err.to_string()),
        }
    }

    pub fn fail(&mut self, id: impl Into<String>, reason: impl Into<String>) {
        self.failed.push(ResourceFailure {
            id: id.into(),
            reason: reason.into(),
        });
    }

    /// Fold another partial outcome into this one
    pub fn merge(&mut self, other: BatchOutcome<T>) {
        self.results.extend(other.results);
        self.failed.extend(other.failed);
    }

    /// Derive `succeeded` from `results` and sort failures. Call once all records are in.
    pub fn finish(mut self) -> Self {
        self.succeeded = self.results.keys().cloned().collect();
        self.failed.sort_by(|a, b| a.id.cmp(&b.id));
        self
    }
}
