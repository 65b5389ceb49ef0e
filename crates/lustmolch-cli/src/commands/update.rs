//! `lustmolch update-containers`: distribute user keys.

use clap::Args;
use lustmolch_core::lock::LockMode;
use lustmolch_runtime::provision::Provisioner;
use lustmolch_runtime::tool::SystemRunner;

use super::{GlobalArgs, Session};

/// Arguments for the `update-containers` command.
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Only log what would be written.
    #[arg(long)]
    pub dry_run: bool,
}

/// Executes the `update-containers` command.
///
/// # Errors
///
/// Returns an error if an authorized keys file cannot be written.
pub fn execute(global: &GlobalArgs, args: &UpdateArgs) -> anyhow::Result<()> {
    // Exclusive: keeps concurrent membership edits out while files are written.
    let session = Session::open(global, LockMode::Exclusive)?;
    let runner = SystemRunner;
    let count = Provisioner::new(&session.settings, &global.root, &runner)
        .dry_run(args.dry_run)
        .update_containers(&session.inventory)?;
    tracing::info!(containers = count, "authorized keys updated");
    Ok(())
}
