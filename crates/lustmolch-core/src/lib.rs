//! # lustmolch-core
//!
//! The allocation and configuration logic behind lustmolch:
//!
//! - **Inventory**: the JSON document of known containers and users, and the
//!   advisory lock that serializes access to it.
//! - **Allocator**: next free SSH port and next free /30 address block.
//! - **Template**: `{{ key }}` substitution over a fixed set of named
//!   configuration templates.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod allocator;
pub mod inventory;
pub mod lock;
pub mod template;
