//! Generic retrying execution wrapper.

use crate::classify::{ErrorClassifier, ErrorCode, ErrorRecord};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Per-operation execution budget.
///
/// A closed configuration struct: retry count, base backoff delay,
/// timeout, and the error codes that must never be retried regardless of
/// their general retryability.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum recorded attempts per operation.
    pub max_retries: u32,
    /// Base backoff delay, doubled per prior attempt.
    pub base_delay: Duration,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Codes that stop the retry loop immediately.
    pub skip_retry_on: Vec<ErrorCode>,
    /// Context attached to classified failures, e.g. a resource set id.
    pub context: String,
}

impl ExecutorConfig {
    /// Creates the default budget: 3 attempts, 1 s base delay, 30 s
    /// timeout, no skip list.
    pub fn new() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            timeout: Duration::from_millis(30_000),
            skip_retry_on: Vec::new(),
            context: String::new(),
        }
    }

    /// Sets the attempt budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the base backoff delay.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Sets the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Adds a code to the skip list.
    pub fn skip_retry_on(mut self, code: ErrorCode) -> Self {
        self.skip_retry_on.push(code);
        self
    }

    /// Sets the failure context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Returns the reason this budget is unusable, if any.
    fn invalid_reason(&self) -> Option<&'static str> {
        if self.max_retries == 0 {
            Some("validation failed: max_retries must be at least 1")
        } else if self.timeout.is_zero() {
            Some("validation failed: timeout must be non-zero")
        } else {
            None
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The result of a wrapped execution.
///
/// Returned instead of an error so callers can inspect partial progress
/// uniformly.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome<T> {
    /// Whether the operation eventually succeeded.
    pub success: bool,
    /// The operation's value on success.
    pub data: Option<T>,
    /// The final classified failure on exhaustion.
    pub error: Option<ErrorRecord>,
    /// Number of retries performed (0 for a first-attempt result).
    pub retry_count: u32,
    /// Total wall-clock time including backoff sleeps.
    pub total_time: Duration,
}

impl<T> ExecutionOutcome<T> {
    fn succeeded(data: T, retry_count: u32, total_time: Duration) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            retry_count,
            total_time,
        }
    }

    fn failed(error: ErrorRecord, retry_count: u32, total_time: Duration) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            retry_count,
            total_time,
        }
    }

    /// Converts the outcome into a `Result`.
    pub fn into_result(self) -> Result<T, ErrorRecord> {
        match (self.data, self.error) {
            (Some(data), _) => Ok(data),
            (None, Some(error)) => Err(error),
            // An outcome always carries data or an error; this arm is
            // unreachable through the constructors.
            (None, None) => Err(ErrorRecord {
                code: ErrorCode::UnknownError,
                message: "outcome carried neither data nor error".into(),
                operation: String::new(),
                context: String::new(),
                timestamp: std::time::SystemTime::now(),
                retryable: false,
            }),
        }
    }
}

/// Runs operations with timeout, bounded retries, and exponential
/// backoff, classifying every failure through the shared classifier.
///
/// Backoff sleeps pause only the calling thread; concurrent executions
/// of other operations are unaffected.
pub struct RetryExecutor {
    classifier: Arc<ErrorClassifier>,
}

impl RetryExecutor {
    /// Creates an executor over a shared classifier.
    pub fn new(classifier: Arc<ErrorClassifier>) -> Self {
        Self { classifier }
    }

    /// Returns the shared classifier.
    pub fn classifier(&self) -> &Arc<ErrorClassifier> {
        &self.classifier
    }

    /// Executes `op` under the given budget.
    ///
    /// The operation runs on a worker thread and is abandoned when the
    /// timeout expires; expiry is classified as a timeout failure like
    /// any other. Failures whose code appears in the skip list, or whose
    /// code is non-retryable, stop the loop immediately.
    pub fn execute<T, E, F>(&self, name: &str, config: &ExecutorConfig, op: F) -> ExecutionOutcome<T>
    where
        T: Send + 'static,
        E: std::fmt::Display + Send + 'static,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        let start = Instant::now();

        if let Some(reason) = config.invalid_reason() {
            let record = self
                .classifier
                .classify(reason, name, &config.context);
            return ExecutionOutcome::failed(record, 0, start.elapsed());
        }

        let op = Arc::new(op);
        let mut retry_count = 0u32;

        loop {
            let attempt_start = Instant::now();
            let message = match run_attempt(Arc::clone(&op), config.timeout) {
                Ok(Ok(value)) => {
                    self.classifier.record_success(name);
                    return ExecutionOutcome::succeeded(value, retry_count, start.elapsed());
                }
                Ok(Err(error)) => error.to_string(),
                Err(RecvTimeoutError::Timeout) => {
                    format!(
                        "operation {name} timed out after {}ms",
                        config.timeout.as_millis()
                    )
                }
                Err(RecvTimeoutError::Disconnected) => {
                    format!("operation {name} worker terminated unexpectedly")
                }
            };

            let record = self.classifier.classify_timed(
                &message,
                name,
                &config.context,
                attempt_start.elapsed(),
            );

            if config.skip_retry_on.contains(&record.code)
                || !record.retryable
                || !self.classifier.should_retry(name, config.max_retries)
            {
                return ExecutionOutcome::failed(record, retry_count, start.elapsed());
            }

            let delay = self.classifier.retry_delay(name, config.base_delay);
            tracing::debug!(
                operation = name,
                retry = retry_count + 1,
                delay_ms = delay.as_millis() as u64,
                "retrying after backoff"
            );
            thread::sleep(delay);
            retry_count += 1;
        }
    }

    /// Executes a batch concurrently, each operation independently
    /// retried. One operation's exhaustion never cancels its siblings.
    ///
    /// Outcomes are returned in input order.
    pub fn execute_parallel<T, E, F>(
        &self,
        config: &ExecutorConfig,
        ops: Vec<(String, F)>,
    ) -> Vec<ExecutionOutcome<T>>
    where
        T: Send + 'static,
        E: std::fmt::Display + Send + 'static,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        let names: Vec<String> = ops.iter().map(|(name, _)| name.clone()).collect();

        let results = thread::scope(|scope| {
            let handles: Vec<_> = ops
                .into_iter()
                .map(|(name, op)| scope.spawn(move || self.execute(&name, config, op)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join())
                .collect::<Vec<_>>()
        });

        results
            .into_iter()
            .zip(names)
            .map(|(result, name)| match result {
                Ok(outcome) => outcome,
                Err(_) => {
                    let record = self.classifier.classify(
                        &format!("operation {name} worker panicked"),
                        &name,
                        &config.context,
                    );
                    ExecutionOutcome::failed(record, 0, Duration::ZERO)
                }
            })
            .collect()
    }

    /// Executes a batch in order, stopping the remaining sequence as
    /// soon as one step fails with a non-retryable error.
    ///
    /// Returns the outcomes of the executed prefix.
    pub fn execute_sequential<T, E, F>(
        &self,
        config: &ExecutorConfig,
        ops: Vec<(String, F)>,
    ) -> Vec<ExecutionOutcome<T>>
    where
        T: Send + 'static,
        E: std::fmt::Display + Send + 'static,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        let mut outcomes = Vec::new();
        for (name, op) in ops {
            let outcome = self.execute(&name, config, op);
            let fatal = outcome
                .error
                .as_ref()
                .map(|e| !e.retryable)
                .unwrap_or(false);
            outcomes.push(outcome);
            if fatal {
                break;
            }
        }
        outcomes
    }
}

/// Runs one attempt on a worker thread, waiting up to `timeout`.
fn run_attempt<T, E, F>(
    op: Arc<F>,
    timeout: Duration,
) -> Result<Result<T, E>, RecvTimeoutError>
where
    T: Send + 'static,
    E: Send + 'static,
    F: Fn() -> Result<T, E> + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(op());
    });
    rx.recv_timeout(timeout)
}
