//! Persistent inventory of containers and users.
//!
//! The whole inventory is a single JSON document. It is loaded once at the
//! start of a command and saved at most once at the end; every mutation in
//! between only touches the in-memory [`Inventory`].

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use lustmolch_common::config::{Settings, SettingsOverrides};
use lustmolch_common::error::{LustmolchError, Result};
use lustmolch_common::types::{ContainerRecord, UserRecord};
use serde::{Deserialize, Serialize};

/// In-memory view of the inventory document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// Settings overrides stored as top-level keys of the document.
    #[serde(flatten)]
    pub settings: SettingsOverrides,
    /// Known users, keyed by name.
    #[serde(default)]
    pub users: BTreeMap<String, UserRecord>,
    /// Provisioned containers, keyed by name.
    #[serde(default)]
    pub containers: BTreeMap<String, ContainerRecord>,
}

impl Inventory {
    /// Resolves the settings overrides carried by this document.
    ///
    /// # Errors
    ///
    /// Returns an error if an override is invalid.
    pub fn settings(&self) -> Result<Settings> {
        self.settings.resolve()
    }

    /// Looks up a container by name.
    #[must_use]
    pub fn container(&self, name: &str) -> Option<&ContainerRecord> {
        self.containers.get(name)
    }

    /// Inserts or replaces a container record, returning the previous one.
    pub fn add_container(&mut self, record: ContainerRecord) -> Option<ContainerRecord> {
        tracing::debug!(name = %record.name, "adding container to inventory");
        self.containers.insert(record.name.clone(), record)
    }

    /// Removes a container record.
    pub fn remove_container(&mut self, name: &str) -> Option<ContainerRecord> {
        tracing::debug!(name, "removing container from inventory");
        self.containers.remove(name)
    }

    /// Inserts or replaces a user record, returning the previous one.
    pub fn add_user(&mut self, record: UserRecord) -> Option<UserRecord> {
        tracing::debug!(name = %record.name, "adding user to inventory");
        self.users.insert(record.name.clone(), record)
    }

    /// Removes a user record.
    ///
    /// Container access lists are left untouched; see [`Self::unlink_user`].
    pub fn remove_user(&mut self, name: &str) -> Option<UserRecord> {
        tracing::debug!(name, "removing user from inventory");
        self.users.remove(name)
    }

    /// Removes `user` from every container's access list.
    ///
    /// Returns the number of containers that referenced the user.
    pub fn unlink_user(&mut self, user: &str) -> usize {
        let mut touched = 0;
        for container in self.containers.values_mut() {
            let before = container.users.len();
            container.users.retain(|u| u != user);
            if container.users.len() != before {
                touched += 1;
            }
        }
        touched
    }

    /// Adds `user` to the access list of `container`.
    ///
    /// Returns `false` if the user already had access.
    ///
    /// # Errors
    ///
    /// Returns [`LustmolchError::NotFound`] if either the container or the
    /// user is unknown.
    pub fn grant_access(&mut self, container: &str, user: &str) -> Result<bool> {
        if !self.users.contains_key(user) {
            return Err(not_found("user", user));
        }
        let record = self
            .containers
            .get_mut(container)
            .ok_or_else(|| not_found("container", container))?;
        if record.has_user(user) {
            return Ok(false);
        }
        record.users.push(user.to_owned());
        Ok(true)
    }

    /// Removes `user` from the access list of `container`.
    ///
    /// Returns `false` if the user did not have access.
    ///
    /// # Errors
    ///
    /// Returns [`LustmolchError::NotFound`] if the container is unknown.
    pub fn revoke_access(&mut self, container: &str, user: &str) -> Result<bool> {
        let record = self
            .containers
            .get_mut(container)
            .ok_or_else(|| not_found("container", container))?;
        let before = record.users.len();
        record.users.retain(|u| u != user);
        Ok(record.users.len() != before)
    }

    /// Public keys of the users allowed into `container`, in access list
    /// order.
    ///
    /// Names without a user record are skipped.
    #[must_use]
    pub fn authorized_keys(&self, container: &ContainerRecord) -> Vec<&str> {
        container
            .users
            .iter()
            .filter_map(|name| self.users.get(name))
            .map(|user| user.key.as_str())
            .collect()
    }
}

fn not_found(kind: &'static str, id: &str) -> LustmolchError {
    LustmolchError::NotFound {
        kind,
        id: id.to_owned(),
    }
}

/// Loads the inventory from disk.
///
/// A missing file yields an empty inventory.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_inventory(path: &Path) -> Result<Inventory> {
    tracing::debug!(path = %path.display(), "loading inventory");
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "inventory does not exist, using defaults");
            return Ok(Inventory::default());
        }
        Err(e) => return Err(LustmolchError::io(path, e)),
    };
    Ok(serde_json::from_str(&content)?)
}

/// Persists the inventory to disk atomically.
///
/// The document is written to a sibling temporary file and renamed over
/// `path`. Missing parent directories are created.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_inventory(path: &Path, inventory: &Inventory) -> Result<()> {
    tracing::debug!(path = %path.display(), "saving inventory");
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| LustmolchError::io(parent, e))?;
    }

    let mut json = serde_json::to_string_pretty(inventory)?;
    json.push('\n');

    let tmp = temporary_path(path);
    std::fs::write(&tmp, json).map_err(|e| LustmolchError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        LustmolchError::io(path, e)
    })
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".tmp");
    path.with_file_name(name)
}
