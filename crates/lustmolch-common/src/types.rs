//! Records persisted in the inventory document.

use serde::{Deserialize, Serialize};

use crate::constants::MAX_CONTAINER_NAME_LENGTH;
use crate::error::{LustmolchError, Result};

/// A provisioned container as stored in the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecord {
    /// Machine name, unique across the inventory.
    pub name: String,
    /// Host port forwarded to the container's sshd.
    pub ssh_port: u16,
    /// Address of the host side of the veth pair, optionally with a prefix.
    pub ip_address_host: String,
    /// Address of the container side of the veth pair, optionally with a prefix.
    pub ip_address_container: String,
    /// Prefix length written into the network files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_subnet_length: Option<u8>,
    /// Public URL served by the reverse proxy.
    pub url: String,
    /// Names of the users allowed to log in, in insertion order.
    #[serde(default)]
    pub users: Vec<String>,
}

impl ContainerRecord {
    /// Returns whether `user` is on this container's access list.
    #[must_use]
    pub fn has_user(&self, user: &str) -> bool {
        self.users.iter().any(|u| u == user)
    }
}

/// A user whose public key can be installed into containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// User name, unique across the inventory.
    pub name: String,
    /// OpenSSH public key material, stored verbatim.
    pub key: String,
}

/// Strips an optional `/prefix` suffix from a stored address.
#[must_use]
pub fn strip_prefix_length(address: &str) -> &str {
    address.split_once('/').map_or(address, |(addr, _)| addr)
}

/// Checks that `name` is usable as a machine name, path component, and
/// interface suffix.
///
/// # Errors
///
/// Returns [`LustmolchError::Config`] describing the first violated rule.
pub fn validate_container_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(LustmolchError::Config {
            message: format!("invalid container name {name:?}: {reason}"),
        })
    };

    if name.is_empty() {
        return invalid("must not be empty");
    }
    if name.len() > MAX_CONTAINER_NAME_LENGTH {
        return invalid("too long");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return invalid("only lowercase letters, digits and '-' are allowed");
    }
    if name.starts_with('-') || name.ends_with('-') {
        return invalid("must not start or end with '-'");
    }
    Ok(())
}
