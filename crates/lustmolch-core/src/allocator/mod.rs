//! Per-container resource allocation.
//!
//! Both allocators are lookups for names already in the inventory and
//! scan-based allocations otherwise: they only look at the containers
//! currently present, never at a persisted counter.

pub mod address;
pub mod port;

pub use address::{IpPair, next_ip_pair};
pub use port::next_ssh_port;
