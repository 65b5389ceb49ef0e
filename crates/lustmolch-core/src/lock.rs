//! Advisory lock serializing access to the inventory document.
//!
//! Every command holds the lock from before it loads the inventory until
//! after it has saved it, so two invocations against the same document
//! cannot interleave their read-modify-write cycles.

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use lustmolch_common::constants::LOCK_SUFFIX;
use lustmolch_common::error::{LustmolchError, Result};
use nix::fcntl::{Flock, FlockArg};

/// How the lock is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Readers only; any number may hold the lock together.
    Shared,
    /// A single writer.
    Exclusive,
}

/// A held `flock(2)` lock, released on drop.
pub struct InventoryLock {
    _guard: Flock<File>,
    path: PathBuf,
}

impl InventoryLock {
    /// Blocks until the lock next to `inventory_path` is acquired.
    ///
    /// The lock file is `<inventory_path>.lock`; it and its parent
    /// directory are created if missing.
    ///
    /// # Errors
    ///
    /// Returns [`LustmolchError::Lock`] if the lock file cannot be opened or
    /// locked.
    pub fn acquire(inventory_path: &Path, mode: LockMode) -> Result<Self> {
        let path = lock_path(inventory_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| LustmolchError::Lock {
                path: path.clone(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|source| LustmolchError::Lock {
                path: path.clone(),
                source,
            })?;

        let arg = match mode {
            LockMode::Shared => FlockArg::LockShared,
            LockMode::Exclusive => FlockArg::LockExclusive,
        };
        tracing::debug!(path = %path.display(), ?mode, "acquiring inventory lock");
        let guard = Flock::lock(file, arg).map_err(|(_, errno)| LustmolchError::Lock {
            path: path.clone(),
            source: errno.into(),
        })?;
        Ok(Self {
            _guard: guard,
            path,
        })
    }

    /// Returns the path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for InventoryLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryLock")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Returns the lock file path belonging to an inventory document.
#[must_use]
pub fn lock_path(inventory_path: &Path) -> PathBuf {
    let mut name = OsString::from(inventory_path.as_os_str());
    name.push(LOCK_SUFFIX);
    PathBuf::from(name)
}
