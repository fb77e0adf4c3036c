//! # apiforge Catalog
//!
//! Shared data model for apiforge.
//!
//! This crate provides:
//! - `Resource` for internal entity definitions (fields, access rules)
//! - `EndpointSpec` for derived API endpoint descriptions
//! - `RegistryRecord` for the externally published unit
//! - `ResourceChangeEvent` for change propagation
//!
//! This is a pure types crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change;
mod endpoint;
mod record;
mod resource;

pub use change::{ChangeType, ResourceChangeEvent};
pub use endpoint::{EndpointSpec, HttpMethod};
pub use record::{PublishStatus, RegistryRecord, Visibility};
pub use resource::{AccessOperation, AccessRule, Field, FieldKind, Resource};
