//! # apiforge Testkit
//!
//! Shared fixtures and property-test generators for the apiforge test
//! suites.
//!
//! This crate provides:
//! - Sample resources and resource sets (`fixtures`)
//! - Proptest strategies for resources and fields (`generators`)

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
