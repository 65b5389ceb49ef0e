//! `lustmolch grant-access` / `revoke-access`: edit a container's access
//! list.

use clap::Args;
use lustmolch_core::lock::LockMode;

use super::{GlobalArgs, Session};

/// Arguments for the `grant-access` and `revoke-access` commands.
#[derive(Args, Debug)]
pub struct AccessArgs {
    /// Container name.
    pub container: String,

    /// User name.
    pub user: String,
}

/// Executes the `grant-access` command.
///
/// # Errors
///
/// Returns an error if the container or user is unknown, or the inventory
/// cannot be saved.
pub fn grant(global: &GlobalArgs, args: &AccessArgs) -> anyhow::Result<()> {
    let mut session = Session::open(global, LockMode::Exclusive)?;
    if session.inventory.grant_access(&args.container, &args.user)? {
        session.save()?;
        tracing::info!(container = %args.container, user = %args.user, "granted access");
        tracing::info!("run \"lustmolch update-containers\" to apply");
    } else {
        tracing::info!(container = %args.container, user = %args.user, "user already has access");
    }
    Ok(())
}

/// Executes the `revoke-access` command.
///
/// # Errors
///
/// Returns an error if the container is unknown or the inventory cannot be
/// saved.
pub fn revoke(global: &GlobalArgs, args: &AccessArgs) -> anyhow::Result<()> {
    let mut session = Session::open(global, LockMode::Exclusive)?;
    if session.inventory.revoke_access(&args.container, &args.user)? {
        session.save()?;
        tracing::info!(container = %args.container, user = %args.user, "revoked access");
        tracing::info!("run \"lustmolch update-containers\" to apply");
    } else {
        tracing::info!(container = %args.container, user = %args.user, "user had no access");
    }
    Ok(())
}
