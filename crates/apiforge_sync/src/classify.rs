//! Error classification, retry eligibility, and backoff policy.

use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, SystemTime};

/// Upper bound on the backoff delay between retries.
pub const MAX_RETRY_DELAY: Duration = Duration::from_millis(30_000);

/// Default cap on the global error history.
const DEFAULT_HISTORY_CAP: usize = 100;

/// Default cap on the per-operation attempt history.
const DEFAULT_ATTEMPTS_CAP: usize = 50;

/// The closed failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Transport-level failure reaching a collaborator.
    NetworkError,
    /// An operation exceeded its time budget.
    TimeoutError,
    /// Authentication or authorization failure.
    AuthError,
    /// A collaborator is throttling requests.
    RateLimitError,
    /// A resource definition cannot be analyzed or published.
    SchemaError,
    /// The request itself was invalid.
    ValidationError,
    /// The backing database refused or dropped the connection.
    DatabaseConnectionError,
    /// Anything the rules did not match.
    UnknownError,
    /// A sync for the resource set is already in flight.
    SyncInProgress,
}

/// Log severity assigned to a classified failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operator attention required.
    Error,
    /// Transient but noteworthy.
    Warn,
    /// Expected noise.
    Info,
}

impl ErrorCode {
    /// Returns the code as its stable uppercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::TimeoutError => "TIMEOUT_ERROR",
            ErrorCode::AuthError => "AUTH_ERROR",
            ErrorCode::RateLimitError => "RATE_LIMIT_ERROR",
            ErrorCode::SchemaError => "SCHEMA_ERROR",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::DatabaseConnectionError => "DATABASE_CONNECTION_ERROR",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
            ErrorCode::SyncInProgress => "SYNC_IN_PROGRESS",
        }
    }

    /// Returns true if failures with this code are worth retrying.
    ///
    /// Unknown failures are treated as potentially transient and retried
    /// conservatively; auth, schema and validation failures are fatal on
    /// first occurrence.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::NetworkError
                | ErrorCode::TimeoutError
                | ErrorCode::RateLimitError
                | ErrorCode::DatabaseConnectionError
                | ErrorCode::UnknownError
        )
    }

    /// Returns the log severity for failures with this code.
    pub fn severity(&self) -> Severity {
        match self {
            ErrorCode::AuthError | ErrorCode::SchemaError | ErrorCode::ValidationError => {
                Severity::Error
            }
            ErrorCode::RateLimitError | ErrorCode::TimeoutError => Severity::Warn,
            _ => Severity::Info,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    /// Taxonomy member.
    pub code: ErrorCode,
    /// Rendered failure message.
    pub message: String,
    /// Operation that failed.
    pub operation: String,
    /// Caller-supplied context, e.g. the resource set id.
    pub context: String,
    /// Wall-clock time of classification.
    pub timestamp: SystemTime,
    /// Whether the failure is worth retrying.
    pub retryable: bool,
}

/// One recorded execution attempt for an operation.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    /// Operation name.
    pub operation: String,
    /// Zero-based attempt index.
    pub attempt: u32,
    /// The classified error, if the attempt failed.
    pub error: Option<ErrorRecord>,
    /// Time the attempt took.
    pub elapsed: Duration,
}

/// Aggregate counts from the error history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorStats {
    /// Total recorded errors.
    pub total: u64,
    /// Count per taxonomy code, in stable code order.
    pub counts: Vec<(&'static str, u64)>,
}

/// Matches a rendered failure message against the taxonomy rules.
///
/// Rules are checked in a fixed order so mixed messages classify
/// deterministically; anything unmatched is an unknown error.
fn classify_message(message: &str) -> ErrorCode {
    let text = message.to_lowercase();
    let contains_any = |needles: &[&str]| needles.iter().any(|n| text.contains(n));

    if contains_any(&["in progress"]) {
        ErrorCode::SyncInProgress
    } else if contains_any(&["timed out", "timeout"]) {
        ErrorCode::TimeoutError
    } else if contains_any(&["rate limit", "too many requests", "429"]) {
        ErrorCode::RateLimitError
    } else if contains_any(&["unauthorized", "forbidden", "authentication", "invalid token"]) {
        ErrorCode::AuthError
    } else if contains_any(&["database connection", "connection pool", "database is down"]) {
        ErrorCode::DatabaseConnectionError
    } else if contains_any(&[
        "network",
        "connection refused",
        "connection reset",
        "unreachable",
        "unavailable",
        "dns",
    ]) {
        ErrorCode::NetworkError
    } else if contains_any(&["schema error", "schema mismatch"]) {
        ErrorCode::SchemaError
    } else if contains_any(&["verification failed", "validation", "invalid", "rejected", "not found"])
    {
        ErrorCode::ValidationError
    } else {
        ErrorCode::UnknownError
    }
}

/// Classifies raw failures and tracks the rolling attempt/error history
/// that drives retry eligibility and backoff.
///
/// The history is diagnostic state: writers append and trim under a
/// short lock, and a lost trim race is harmless.
pub struct ErrorClassifier {
    attempts: RwLock<HashMap<String, Vec<AttemptRecord>>>,
    history: RwLock<VecDeque<ErrorRecord>>,
    history_cap: usize,
    attempts_cap: usize,
}

impl ErrorClassifier {
    /// Creates a classifier with the default history caps.
    pub fn new() -> Self {
        Self::with_caps(DEFAULT_HISTORY_CAP, DEFAULT_ATTEMPTS_CAP)
    }

    /// Creates a classifier with explicit caps.
    pub fn with_caps(history_cap: usize, attempts_cap: usize) -> Self {
        Self {
            attempts: RwLock::new(HashMap::new()),
            history: RwLock::new(VecDeque::new()),
            history_cap,
            attempts_cap,
        }
    }

    /// Classifies a failure and records it.
    ///
    /// Appends to the operation's rolling attempt history and to the
    /// global error history (newest first, truncated at the cap), and
    /// logs the failure at its mapped severity.
    pub fn classify(&self, message: &str, operation: &str, context: &str) -> ErrorRecord {
        self.classify_timed(message, operation, context, Duration::ZERO)
    }

    /// Classifies a failure with a known attempt duration.
    pub fn classify_timed(
        &self,
        message: &str,
        operation: &str,
        context: &str,
        elapsed: Duration,
    ) -> ErrorRecord {
        let code = classify_message(message);
        let record = ErrorRecord {
            code,
            message: message.to_string(),
            operation: operation.to_string(),
            context: context.to_string(),
            timestamp: SystemTime::now(),
            retryable: code.is_retryable(),
        };

        match code.severity() {
            Severity::Error => {
                tracing::error!(operation, context, code = code.as_str(), "{message}");
            }
            Severity::Warn => {
                tracing::warn!(operation, context, code = code.as_str(), "{message}");
            }
            Severity::Info => {
                tracing::info!(operation, context, code = code.as_str(), "{message}");
            }
        }

        {
            let mut attempts = self.attempts.write();
            let list = attempts.entry(operation.to_string()).or_default();
            let attempt = list.len() as u32;
            list.push(AttemptRecord {
                operation: operation.to_string(),
                attempt,
                error: Some(record.clone()),
                elapsed,
            });
            if list.len() > self.attempts_cap {
                let overflow = list.len() - self.attempts_cap;
                list.drain(0..overflow);
            }
        }

        {
            let mut history = self.history.write();
            history.push_front(record.clone());
            history.truncate(self.history_cap);
        }

        record
    }

    /// Marks an operation as completed, clearing its attempt history so
    /// the backoff progression starts fresh on the next failure.
    pub fn record_success(&self, operation: &str) {
        self.attempts.write().remove(operation);
    }

    /// Returns the number of recorded attempts for an operation.
    pub fn attempt_count(&self, operation: &str) -> usize {
        self.attempts
            .read()
            .get(operation)
            .map(|l| l.len())
            .unwrap_or(0)
    }

    /// Computes the backoff delay before the next attempt of an
    /// operation: `base_delay` doubled per prior recorded attempt,
    /// capped at [`MAX_RETRY_DELAY`].
    pub fn retry_delay(&self, operation: &str, base_delay: Duration) -> Duration {
        let attempts = self.attempt_count(operation) as u32;
        let exponent = attempts.saturating_sub(1).min(20);
        let millis = (base_delay.as_millis() as u64).saturating_mul(1 << exponent);
        Duration::from_millis(millis).min(MAX_RETRY_DELAY)
    }

    /// Returns true when the operation is still eligible for a retry:
    /// fewer recorded attempts than the budget, and a retryable most
    /// recent error.
    pub fn should_retry(&self, operation: &str, max_retries: u32) -> bool {
        let attempts = self.attempts.read();
        let Some(list) = attempts.get(operation) else {
            return true;
        };
        if list.len() as u32 >= max_retries {
            return false;
        }
        match list.last().and_then(|a| a.error.as_ref()) {
            Some(error) => error.retryable,
            None => true,
        }
    }

    /// Returns a copy of the global error history, newest first.
    pub fn history(&self) -> Vec<ErrorRecord> {
        self.history.read().iter().cloned().collect()
    }

    /// Aggregates error counts per taxonomy code.
    pub fn error_stats(&self) -> ErrorStats {
        let history = self.history.read();
        let mut by_code: HashMap<ErrorCode, u64> = HashMap::new();
        for record in history.iter() {
            *by_code.entry(record.code).or_default() += 1;
        }

        let order = [
            ErrorCode::NetworkError,
            ErrorCode::TimeoutError,
            ErrorCode::AuthError,
            ErrorCode::RateLimitError,
            ErrorCode::SchemaError,
            ErrorCode::ValidationError,
            ErrorCode::DatabaseConnectionError,
            ErrorCode::UnknownError,
            ErrorCode::SyncInProgress,
        ];
        let counts = order
            .iter()
            .filter_map(|code| {
                by_code
                    .get(code)
                    .map(|count| (code.as_str(), *count))
            })
            .collect();

        ErrorStats {
            total: history.len() as u64,
            counts,
        }
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}
