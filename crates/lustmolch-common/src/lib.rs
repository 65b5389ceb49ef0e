//! # lustmolch-common
//!
//! Shared records, error definitions, settings, and constants used across
//! the lustmolch workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate and provides the primitives the inventory store, the
//! allocators, and the provisioning flows build upon.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
