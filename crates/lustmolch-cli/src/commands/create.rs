//! `lustmolch create-container`: provision and start a new container.

use clap::Args;
use lustmolch_core::lock::LockMode;
use lustmolch_runtime::provision::Provisioner;
use lustmolch_runtime::tool::SystemRunner;

use super::{GlobalArgs, Session};

/// Arguments for the `create-container` command.
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Only log what would be done.
    #[arg(long)]
    pub dry_run: bool,

    /// Container name; also the machine and host name.
    pub name: String,
}

/// Executes the `create-container` command.
///
/// # Errors
///
/// Returns an error if any provisioning step fails. Steps completed before
/// the failure are not undone.
pub fn execute(global: &GlobalArgs, args: &CreateArgs) -> anyhow::Result<()> {
    let mut session = Session::open(global, LockMode::Exclusive)?;
    let runner = SystemRunner;
    let record = Provisioner::new(&session.settings, &global.root, &runner)
        .dry_run(args.dry_run)
        .create_container(&mut session.inventory, &args.name)?;

    if !args.dry_run {
        session.save()?;
    }
    tracing::info!(
        name = %record.name,
        ssh_port = record.ssh_port,
        url = %record.url,
        "container ready"
    );
    Ok(())
}
