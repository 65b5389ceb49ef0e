//! `lustmolch add-user`: register a user's public key.

use std::path::Path;

use anyhow::Context as _;
use clap::Args;
use lustmolch_common::types::UserRecord;
use lustmolch_core::lock::LockMode;

use super::{GlobalArgs, Session};

/// Arguments for the `add-user` command.
#[derive(Args, Debug)]
pub struct AddUserArgs {
    /// Treat KEY as the public key itself instead of a path to it.
    #[arg(long)]
    pub key_string: bool,

    /// User name.
    pub name: String,

    /// Path to a public key file, or the key with `--key-string`.
    pub key: String,
}

/// Executes the `add-user` command.
///
/// An existing user with the same name has their key replaced.
///
/// # Errors
///
/// Returns an error if the key file cannot be read, the key is empty, or
/// the inventory cannot be saved.
pub fn execute(global: &GlobalArgs, args: &AddUserArgs) -> anyhow::Result<()> {
    let key = read_key(&args.key, args.key_string)?;
    let mut session = Session::open(global, LockMode::Exclusive)?;
    let previous = session.inventory.add_user(UserRecord {
        name: args.name.clone(),
        key,
    });
    session.save()?;

    if previous.is_some() {
        tracing::info!(name = %args.name, "replaced key of existing user");
    } else {
        tracing::info!(name = %args.name, "added user");
    }
    tracing::info!("run \"lustmolch update-containers\" to distribute the key");
    Ok(())
}

fn read_key(key: &str, key_string: bool) -> anyhow::Result<String> {
    let raw = if key_string {
        key.to_owned()
    } else {
        std::fs::read_to_string(Path::new(key))
            .with_context(|| format!("failed to read public key file {key}"))?
    };
    let key = raw.trim();
    anyhow::ensure!(!key.is_empty(), "public key must not be empty");
    anyhow::ensure!(!key.contains('\n'), "public key must be a single line");
    Ok(key.to_owned())
}
