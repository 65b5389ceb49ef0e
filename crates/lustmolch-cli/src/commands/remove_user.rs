//! `lustmolch remove-user`: forget a user and their access.

use clap::Args;
use lustmolch_common::error::LustmolchError;
use lustmolch_core::inventory::Inventory;
use lustmolch_core::lock::LockMode;

use super::{GlobalArgs, Session};

/// Arguments for the `remove-user` command.
#[derive(Args, Debug)]
pub struct RemoveUserArgs {
    /// User name.
    pub name: String,
}

/// Executes the `remove-user` command.
///
/// # Errors
///
/// Returns an error if the user is neither registered nor named by any
/// access list, or the inventory cannot be saved.
pub fn execute(global: &GlobalArgs, args: &RemoveUserArgs) -> anyhow::Result<()> {
    let mut session = Session::open(global, LockMode::Exclusive)?;
    let unlinked = forget_user(&mut session.inventory, &args.name)?;
    session.save()?;

    tracing::info!(name = %args.name, containers = unlinked, "removed user");
    if unlinked > 0 {
        tracing::info!("run \"lustmolch update-containers\" to revoke the key");
    }
    Ok(())
}

/// Drops the user record and every access list entry naming `name`.
///
/// Access list entries left behind by an earlier removal are still
/// cleaned up. Returns the number of containers unlinked.
fn forget_user(inventory: &mut Inventory, name: &str) -> Result<usize, LustmolchError> {
    let removed = inventory.remove_user(name).is_some();
    let unlinked = inventory.unlink_user(name);
    if !removed {
        if unlinked == 0 {
            return Err(LustmolchError::NotFound {
                kind: "user",
                id: name.to_owned(),
            });
        }
        tracing::warn!(
            name,
            containers = unlinked,
            "user was not registered, removed dangling access"
        );
    }
    Ok(unlinked)
}

#[cfg(test)]
mod tests {
    use lustmolch_common::types::{ContainerRecord, UserRecord};

    use super::*;

    fn container(name: &str, users: &[&str]) -> ContainerRecord {
        ContainerRecord {
            name: name.into(),
            ssh_port: 10022,
            ip_address_host: "192.168.0.5".into(),
            ip_address_container: "192.168.0.6".into(),
            ip_subnet_length: Some(30),
            url: format!("{name}.stusta.de"),
            users: users.iter().map(|u| (*u).to_owned()).collect(),
        }
    }

    #[test]
    fn registered_user_is_removed_and_unlinked() {
        let mut inventory = Inventory::default();
        let _ = inventory.add_user(UserRecord {
            name: "alice".into(),
            key: "ssh-ed25519 AAAA".into(),
        });
        let _ = inventory.add_container(container("web", &["alice", "bob"]));
        let _ = inventory.add_container(container("db", &["bob"]));

        assert_eq!(forget_user(&mut inventory, "alice").unwrap(), 1);
        assert!(!inventory.users.contains_key("alice"));
        assert_eq!(inventory.containers["web"].users, vec!["bob"]);
    }

    #[test]
    fn dangling_access_is_cleaned_without_a_record() {
        let mut inventory = Inventory::default();
        let _ = inventory.add_container(container("web", &["ghost"]));
        let _ = inventory.add_container(container("db", &["ghost", "bob"]));

        assert_eq!(forget_user(&mut inventory, "ghost").unwrap(), 2);
        assert!(inventory.containers["web"].users.is_empty());
        assert_eq!(inventory.containers["db"].users, vec!["bob"]);
    }

    #[test]
    fn unknown_user_is_not_found() {
        let mut inventory = Inventory::default();
        let _ = inventory.add_container(container("web", &["bob"]));

        let err = forget_user(&mut inventory, "carol").unwrap_err();
        assert!(matches!(err, LustmolchError::NotFound { kind: "user", .. }));
        assert_eq!(inventory.containers["web"].users, vec!["bob"]);
    }
}
