//! Error types for the sync engine.

use apiforge_analyzer::AnalyzerError;
use apiforge_registry::StoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// A sync for this resource set is already in flight.
    #[error("sync already in progress for resource set {resource_set_id}")]
    SyncInProgress {
        /// The contended resource set.
        resource_set_id: String,
    },

    /// A store or provider call failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Schema analysis failed.
    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),

    /// The post-sync read-back found a different endpoint count than the
    /// analyzer derived.
    #[error("verification failed: expected {expected} endpoints, found {actual}")]
    VerificationMismatch {
        /// Count derived by the analyzer.
        expected: u64,
        /// Count read back from the store.
        actual: u64,
    },

    /// An incremental re-sync triggered by a change event failed.
    #[error("incremental sync failed: {message}")]
    Incremental {
        /// Classified failure message.
        message: String,
    },
}

impl SyncError {
    /// Creates an in-progress error.
    pub fn in_progress(resource_set_id: impl Into<String>) -> Self {
        Self::SyncInProgress {
            resource_set_id: resource_set_id.into(),
        }
    }
}
