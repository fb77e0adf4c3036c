//! Error types for schema analysis.

use thiserror::Error;

/// Result type for analyzer operations.
pub type AnalyzerResult<T> = Result<T, AnalyzerError>;

/// Errors that can occur during schema analysis.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalyzerError {
    /// The resource is an internal table and must not be published.
    #[error("schema error: resource {name} is internal and excluded from publication")]
    ExcludedResource {
        /// Name of the excluded resource.
        name: String,
    },

    /// The resource has no fields to derive schemas from.
    #[error("schema error: resource {name} has no fields")]
    EmptyResource {
        /// Name of the empty resource.
        name: String,
    },
}

impl AnalyzerError {
    /// Creates an excluded-resource error.
    pub fn excluded(name: impl Into<String>) -> Self {
        Self::ExcludedResource { name: name.into() }
    }

    /// Creates an empty-resource error.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::EmptyResource { name: name.into() }
    }
}
