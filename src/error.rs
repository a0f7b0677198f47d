//! Error handling module
//!
//! Two layers of errors live here:
//! - [`EngineError`]: faults raised by the pure label engine (pipelines, policies).
//! - [`AppError`]: service-level errors returned by stores, the commit path and HTTP handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Errors produced while evaluating label operations and policies.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A rule or operation is structurally unusable (bad regex, missing field).
    #[error("Configuration error in {context}: {reason}")]
    Configuration { context: String, reason: String },

    /// A custom policy predicate failed. Suppressed at the evaluator boundary.
    #[error("Evaluation fault in policy {policy_id}: {reason}")]
    EvaluationFault { policy_id: String, reason: String },
}

impl EngineError {
    pub fn configuration(context: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::Configuration {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Transient failure talking to the inventory source; safe to retry.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Only transport-level failures may be retried. A conflict needs a re-read.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Unavailable(_))
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Configuration { .. } => AppError::Validation(err.to_string()),
            EngineError::EvaluationFault { .. } => AppError::Internal(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match &self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                None,
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                msg.clone(),
                None,
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                "CONFLICT",
                msg.clone(),
                None,
            ),
            AppError::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "UNAVAILABLE",
                "Inventory source temporarily unavailable".to_string(),
                Some(msg.clone()),
            ),
            AppError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    Some(msg.clone()),
                )
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
            error: details,
            code: Some(error_code.to_string()),
        });

        (status, body).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, AppError>;

/// Helper function to create a not found error
pub fn not_found_error(msg: impl Into<String>) -> AppError {
    AppError::NotFound(msg.into())
}

/// Helper function to create a conflict error
pub fn conflict_error(msg: impl Into<String>) -> AppError {
    AppError::Conflict(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_maps_to_validation() {
        let err: AppError = EngineError::configuration("operation op-1", "invalid regex").into();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("invalid regex")));
    }

    #[test]
    fn test_only_unavailable_is_transient() {
        assert!(AppError::Unavailable("timeout".into()).is_transient());
        assert!(!conflict_error("stale fingerprint").is_transient());
        assert!(!not_found_error("missing").is_transient());
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (not_found_error("missing"), StatusCode::NOT_FOUND),
            (conflict_error("stale"), StatusCode::CONFLICT),
            (AppError::Unavailable("timeout".into()), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
