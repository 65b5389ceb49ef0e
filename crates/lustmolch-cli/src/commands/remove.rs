//! `lustmolch remove-container`: best-effort container teardown.

use clap::Args;
use lustmolch_core::lock::LockMode;
use lustmolch_runtime::provision::Provisioner;
use lustmolch_runtime::tool::SystemRunner;

use super::{GlobalArgs, Session};

/// Arguments for the `remove-container` command.
#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Only log what would be removed.
    #[arg(long)]
    pub dry_run: bool,

    /// Container name.
    pub name: String,
}

/// Executes the `remove-container` command.
///
/// Failing teardown steps are reported but do not fail the command; the
/// container is dropped from the inventory regardless.
///
/// # Errors
///
/// Returns an error if the name is invalid or the inventory cannot be
/// loaded or saved.
pub fn execute(global: &GlobalArgs, args: &RemoveArgs) -> anyhow::Result<()> {
    let mut session = Session::open(global, LockMode::Exclusive)?;
    let runner = SystemRunner;
    let report = Provisioner::new(&session.settings, &global.root, &runner)
        .dry_run(args.dry_run)
        .remove_container(&mut session.inventory, &args.name)?;

    if !args.dry_run && report.was_known {
        session.save()?;
    }
    for failure in report.failures() {
        tracing::warn!(step = %failure.step, "left behind: {}", failure.error);
    }
    Ok(())
}
