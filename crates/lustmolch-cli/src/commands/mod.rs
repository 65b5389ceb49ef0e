//! CLI command definitions and dispatch.

pub mod access;
pub mod add_user;
pub mod create;
pub mod list;
pub mod remove;
pub mod remove_user;
pub mod update;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use lustmolch_common::config::Settings;
use lustmolch_common::constants::DEFAULT_INVENTORY_FILE;
use lustmolch_core::inventory::{Inventory, load_inventory, save_inventory};
use lustmolch_core::lock::{InventoryLock, LockMode};

/// lustmolch: systemd-nspawn container provisioning for a shared host.
#[derive(Parser, Debug)]
#[command(name = "lustmolch", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Path to the inventory file.
    #[arg(
        long,
        global = true,
        env = "LUSTMOLCH_CONFIG_FILE",
        default_value = DEFAULT_INVENTORY_FILE
    )]
    pub config_file: PathBuf,

    /// Filesystem root all host paths are placed under.
    #[arg(long, global = true, env = "LUSTMOLCH_ROOT", default_value = "/")]
    pub root: PathBuf,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List registered containers.
    ListContainers(list::ListArgs),
    /// Create and start a new container.
    CreateContainer(create::CreateArgs),
    /// Add or replace a user and their public key.
    AddUser(add_user::AddUserArgs),
    /// Remove a user and revoke all their container access.
    RemoveUser(remove_user::RemoveUserArgs),
    /// Allow a user into a container.
    GrantAccess(access::AccessArgs),
    /// Take a user's access to a container away.
    RevokeAccess(access::AccessArgs),
    /// Write the authorized keys of every container.
    UpdateContainers(update::UpdateArgs),
    /// Stop a container and delete it with its configuration.
    RemoveContainer(remove::RemoveArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let global = &cli.global;
    match cli.command {
        Command::ListContainers(args) => list::execute(global, &args),
        Command::CreateContainer(args) => create::execute(global, &args),
        Command::AddUser(args) => add_user::execute(global, &args),
        Command::RemoveUser(args) => remove_user::execute(global, &args),
        Command::GrantAccess(args) => access::grant(global, &args),
        Command::RevokeAccess(args) => access::revoke(global, &args),
        Command::UpdateContainers(args) => update::execute(global, &args),
        Command::RemoveContainer(args) => remove::execute(global, &args),
    }
}

/// A locked, loaded inventory for the duration of one command.
pub struct Session {
    path: PathBuf,
    _lock: InventoryLock,
    /// The loaded document.
    pub inventory: Inventory,
    /// Settings resolved from the document.
    pub settings: Settings,
}

impl Session {
    /// Locks and loads the inventory named by `global`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be taken, or the document cannot
    /// be read or carries invalid settings.
    pub fn open(global: &GlobalArgs, mode: LockMode) -> anyhow::Result<Self> {
        let path = global.config_file.clone();
        let lock = InventoryLock::acquire(&path, mode)?;
        let inventory = load_inventory(&path)
            .with_context(|| format!("failed to load inventory {}", path.display()))?;
        let settings = inventory
            .settings()
            .with_context(|| format!("invalid settings in {}", path.display()))?;
        Ok(Self {
            path,
            _lock: lock,
            inventory,
            settings,
        })
    }

    /// Writes the inventory back, still under the lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    pub fn save(&self) -> anyhow::Result<()> {
        save_inventory(&self.path, &self.inventory)
            .with_context(|| format!("failed to save inventory {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), "inventory saved");
        Ok(())
    }
}
