//! Error types for store and provider operations.

use thiserror::Error;

/// Result type for store and provider operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur talking to the registry store or the
/// resource provider.
///
/// Variants carry rendered messages so scripted copies can be queued by
/// the in-memory fault-injecting implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A record, endpoint set, or resource was not found.
    #[error("not found: {what}")]
    NotFound {
        /// Description of the missing item.
        what: String,
    },

    /// The store could not be reached or refused the connection.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Description of the outage.
        message: String,
    },

    /// The store rejected the request as invalid.
    #[error("store rejected request: {message}")]
    Rejected {
        /// Reason for the rejection.
        message: String,
    },

    /// The caller is not authorized for this operation.
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Description of the authorization failure.
        message: String,
    },

    /// The store is throttling requests.
    #[error("rate limit exceeded: {message}")]
    RateLimited {
        /// Description of the throttle.
        message: String,
    },
}

impl StoreError {
    /// Creates a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a rejected error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Creates an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a rate-limited error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StoreError::not_found("record for crm-core");
        assert_eq!(err.to_string(), "not found: record for crm-core");

        let err = StoreError::unavailable("connection refused");
        assert!(err.to_string().contains("unavailable"));

        let err = StoreError::rate_limited("429 from upstream");
        assert!(err.to_string().contains("rate limit"));
    }
}
