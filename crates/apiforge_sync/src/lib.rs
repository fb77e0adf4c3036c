//! # apiforge Sync Engine
//!
//! Publish orchestration and failure handling for apiforge.
//!
//! This crate provides:
//! - Error classification into a closed taxonomy with retry eligibility
//!   and capped exponential backoff
//! - A generic retrying executor with per-operation timeouts
//! - The sync orchestrator driving the publish step machine
//! - Incremental re-sync from resource change events
//!
//! ## Architecture
//!
//! A full publish cycle walks a fixed step sequence:
//!
//! ```text
//! analyzing → building aggregate → upserting registry → clearing stale
//!     → inserting fresh → arming notifications → verifying → done
//! ```
//!
//! with a terminal failed state reachable from any step. Every step runs
//! through the retrying executor, and a failed step aborts the remaining
//! steps of its cycle.
//!
//! ## Key Invariants
//!
//! - At most one in-flight sync per resource set
//! - Endpoint sets are replaced as a whole, never merged
//! - A cycle succeeds only when the persisted endpoint count matches the
//!   derived count
//! - Deprecated records are kept, never deleted

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod classify;
mod error;
mod executor;
mod orchestrator;

pub use classify::{
    AttemptRecord, ErrorClassifier, ErrorCode, ErrorRecord, ErrorStats, Severity, MAX_RETRY_DELAY,
};
pub use error::{SyncError, SyncResult};
pub use executor::{ExecutionOutcome, ExecutorConfig, RetryExecutor};
pub use orchestrator::{
    IncrementalAction, OrchestratorConfig, PublishConfig, SyncOrchestrator, SyncReport, SyncStats,
    SyncStatus, SyncStep,
};
