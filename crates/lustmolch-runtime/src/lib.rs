//! Container provisioning and teardown for lustmolch.
//!
//! The [`provision::Provisioner`] sequences file placements and external
//! tool invocations for creating a machine, retiring it, and distributing
//! SSH keys into it. Creation fails fast; removal is best effort.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod access;
pub mod firewall;
pub mod layout;
pub mod provision;
pub mod removal;
pub mod tool;
