//! Error type for the workflow API boundary.

use thiserror::Error;

/// Result type for callers that want workflow failures as errors.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// A workflow operation that did not succeed.
///
/// Inside the engine failures travel as result objects; this is the one
/// boundary where a failure may be converted into an error for the
/// calling layer.
#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    /// The operation was rejected or a sync aborted.
    #[error("{message}")]
    Rejected {
        /// Human-readable reason.
        message: String,
    },
}

impl WorkflowError {
    /// Creates a rejected error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}
