//! Error types for workflow execution.

use thiserror::Error;

/// Result type for workflow operations.
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Errors that can occur while running a workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// No executor is registered for the op kind.
    #[error("Unknown op kind: {0}")]
    UnknownKind(String),

    /// A required op parameter is absent.
    #[error("Op '{kind}' is missing required parameter '{param}'")]
    MissingParam {
        /// Kind of the offending op.
        kind: String,
        /// Name of the missing parameter.
        param: &'static str,
    },

    /// An op parameter (or the context value it points at) has the wrong shape.
    #[error("Op '{kind}' has invalid parameter '{param}': {message}")]
    InvalidParam {
        /// Kind of the offending op.
        kind: String,
        /// Name of the invalid parameter.
        param: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// The run was asked to stop.
    #[error("Workflow run cancelled")]
    Cancelled,

    /// A `while`/`until` loop hit its iteration ceiling.
    #[error("Loop '{kind}' on '{condition}' exceeded {limit} iterations")]
    LoopLimit {
        /// `while` or `until`.
        kind: String,
        /// Context key the loop polls.
        condition: String,
        /// The ceiling that was hit.
        limit: u64,
    },

    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An HTTP request made by the `fetch` executor failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failure reported by a host executor or injected collaborator.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WorkflowError {
    /// Create a missing parameter error.
    pub fn missing(kind: impl Into<String>, param: &'static str) -> Self {
        Self::MissingParam {
            kind: kind.into(),
            param,
        }
    }

    /// Create an invalid parameter error.
    pub fn invalid(kind: impl Into<String>, param: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParam {
            kind: kind.into(),
            param,
            message: message.into(),
        }
    }

    /// True when the run stopped because cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// True for errors in the workflow definition itself rather than in execution.
    pub fn is_definition_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownKind(_) | Self::MissingParam { .. } | Self::InvalidParam { .. }
        )
    }
}
