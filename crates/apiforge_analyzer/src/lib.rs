//! # apiforge Schema Analyzer
//!
//! Derives the published API surface from internal resource definitions.
//!
//! This crate provides:
//! - CRUD endpoint derivation with request/response JSON schemas
//! - Internal-table exclusion by name prefix
//! - Alignment reports scoring how completely a resource's supporting
//!   artifacts exist
//!
//! Derivation is deterministic: equal resources produce equal output.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod alignment;
mod analyzer;
mod derive;
mod error;

pub use alignment::{AlignmentContext, AlignmentReport, ATTENTION_THRESHOLD};
pub use analyzer::{Analysis, AnalyzerConfig, SchemaAnalyzer};
pub use error::{AnalyzerError, AnalyzerResult};
