//! `lustmolch list-containers`: show the registered containers and users.

use clap::Args;
use lustmolch_core::lock::LockMode;

use super::{GlobalArgs, Session};
use crate::output;

/// Arguments for the `list-containers` command.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Print the raw inventory document instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `list-containers` command.
///
/// # Errors
///
/// Returns an error if the inventory cannot be loaded.
#[allow(clippy::print_stdout)]
pub fn execute(global: &GlobalArgs, args: &ListArgs) -> anyhow::Result<()> {
    let session = Session::open(global, LockMode::Shared)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&session.inventory)?);
    } else {
        print!("{}", output::inventory_tables(&session.inventory));
    }
    Ok(())
}
