//! Taxonomy and label model
//!
//! Shared value types with no behaviour beyond construction helpers.
//! Everything else in the crate depends on these.

pub mod batch;
pub mod history;
pub mod labels;
pub mod operation;
pub mod policy;
pub mod resource;
pub mod snapshot;

// Re-export commonly used types
pub use batch::{BatchOutcome, ResourceFailure};
pub use history::{HistoryChangeType, LabelHistoryEntry};
pub use labels::{LabelDelta, LabelMapping};
pub use operation::{
    Casing, LabelOperation, MatchOperator, OperationConfig, OperationType, RegexGroup,
    SavedPipeline,
};
pub use policy::{GovernancePolicy, PolicyCategory, PolicyViolation, RuleConfig, RuleType, Severity};
pub use resource::{DriftStatus, GceResource, ResourceType};
pub use snapshot::{ChangeType, DiffResult, ResourceSnapshot, TimelineEntry};

use serde::Serialize;

/// Generic success response
#[derive(Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl SuccessResponse<()> {
    pub fn message_only(message: impl Into<String>) -> Self {
        SuccessResponse {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}
