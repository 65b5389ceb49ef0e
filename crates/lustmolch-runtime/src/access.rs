//! Distribution of user keys into containers.
//!
//! The machine's filesystem is controlled by root inside the container, so
//! no path component below the machine directory is followed if it is a
//! symlink.

use std::fs::{self, DirBuilder, File, OpenOptions, Permissions};
use std::io::{self, ErrorKind, Write};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use lustmolch_common::error::{LustmolchError, Result};
use lustmolch_core::inventory::Inventory;
use nix::fcntl::OFlag;

use crate::provision::Provisioner;

const SSH_DIR_MODE: u32 = 0o700;
const AUTHORIZED_KEYS_MODE: u32 = 0o600;

/// Directories from the machine root down to the SSH directory.
const SSH_DIR_COMPONENTS: [&str; 2] = ["root", ".ssh"];
const AUTHORIZED_KEYS: &str = "authorized_keys";

impl Provisioner<'_> {
    /// Rewrites `/root/.ssh/authorized_keys` in every container from its
    /// access list.
    ///
    /// Returns the number of containers written (or that would be written
    /// in a dry run).
    ///
    /// # Errors
    ///
    /// Returns the first filesystem error, including a symlink found on the
    /// way to the keys file.
    pub fn update_containers(&self, inventory: &Inventory) -> Result<usize> {
        let mut written = 0;
        for container in inventory.containers.values() {
            let keys = inventory.authorized_keys(container);
            if keys.len() != container.users.len() {
                tracing::warn!(
                    name = %container.name,
                    "access list names unknown users, skipping them"
                );
            }
            let target = self.layout.root_ssh_dir(&container.name).join(AUTHORIZED_KEYS);
            tracing::info!(
                name = %container.name,
                path = %target.display(),
                keys = keys.len(),
                "writing authorized keys"
            );
            for key in &keys {
                tracing::debug!(name = %container.name, key, "authorized key");
            }
            if !self.dry_run {
                let _ = write_authorized_keys(
                    &self.layout.machine_dir(&container.name),
                    &keys.join("\n"),
                )?;
            }
            written += 1;
        }
        Ok(written)
    }
}

/// Writes `contents` to `root/.ssh/authorized_keys` below `machine_dir`.
fn write_authorized_keys(machine_dir: &Path, contents: &str) -> Result<PathBuf> {
    let mut dir = machine_dir.to_path_buf();
    for component in SSH_DIR_COMPONENTS {
        dir.push(component);
        ensure_directory(&dir)?;
    }

    let ssh_dir = open_no_follow(&dir, OpenOptions::new().read(true), OFlag::O_DIRECTORY)?;
    ssh_dir
        .set_permissions(Permissions::from_mode(SSH_DIR_MODE))
        .map_err(|e| LustmolchError::io(&dir, e))?;

    let target = dir.join(AUTHORIZED_KEYS);
    let mut file = open_no_follow(
        &target,
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(AUTHORIZED_KEYS_MODE),
        OFlag::empty(),
    )?;
    // mode() only applies on creation
    file.set_permissions(Permissions::from_mode(AUTHORIZED_KEYS_MODE))
        .map_err(|e| LustmolchError::io(&target, e))?;
    file.write_all(contents.as_bytes())
        .map_err(|e| LustmolchError::io(&target, e))?;
    Ok(target)
}

/// Creates `path` as a directory unless it already is one. Symlinks and
/// other file types are refused.
fn ensure_directory(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => Err(refused(path, "is a symlink")),
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(refused(path, "is not a directory")),
        Err(e) if e.kind() == ErrorKind::NotFound => DirBuilder::new()
            .mode(SSH_DIR_MODE)
            .create(path)
            .map_err(|e| LustmolchError::io(path, e)),
        Err(e) => Err(LustmolchError::io(path, e)),
    }
}

fn open_no_follow(path: &Path, options: &mut OpenOptions, extra: OFlag) -> Result<File> {
    options
        .custom_flags((OFlag::O_NOFOLLOW | extra).bits())
        .open(path)
        .map_err(|e| LustmolchError::io(path, e))
}

fn refused(path: &Path, reason: &str) -> LustmolchError {
    LustmolchError::io(
        path,
        io::Error::new(ErrorKind::InvalidInput, format!("refusing to write: {reason}")),
    )
}
