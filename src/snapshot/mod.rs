//! Snapshot Module
//!
//! Detecting what drifted since the governance timeline was captured.
//! This module provides:
//! - Canonical label hashes (stable across captures)
//! - The drift detector (timeline snapshots vs present resources)
//! - The timeline store (chronological, pruned captures)

pub mod canonical;
pub mod diff;
pub mod store;

pub use canonical::{canonical_label_hash, parse_label_hash};
pub use diff::{DriftDetector, DriftSummary, EntryDiff};
pub use store::{TimelineEntryMetadata, TimelineStore};
