//! Formatted output helpers for CLI commands.

use std::fmt::Write as _;

use lustmolch_core::inventory::Inventory;

/// Renders the containers and users of `inventory` as two tables.
#[must_use]
pub fn inventory_tables(inventory: &Inventory) -> String {
    let mut out = String::new();
    if inventory.containers.is_empty() {
        out.push_str("No containers registered.\n");
    } else {
        let _ = writeln!(
            out,
            "{:<20} {:<6} {:<16} {:<16} {:<30} USERS",
            "NAME", "SSH", "HOST IP", "CONTAINER IP", "URL"
        );
        for c in inventory.containers.values() {
            let _ = writeln!(
                out,
                "{:<20} {:<6} {:<16} {:<16} {:<30} {}",
                c.name,
                c.ssh_port,
                c.ip_address_host,
                c.ip_address_container,
                c.url,
                if c.users.is_empty() {
                    "-".to_owned()
                } else {
                    c.users.join(",")
                }
            );
        }
    }

    if !inventory.users.is_empty() {
        out.push('\n');
        let _ = writeln!(out, "{:<20} KEY", "USER");
        for u in inventory.users.values() {
            let _ = writeln!(out, "{:<20} {}", u.name, abbreviate_key(&u.key));
        }
    }
    out
}

/// Shortens an OpenSSH public key to its type and comment.
#[must_use]
pub fn abbreviate_key(key: &str) -> String {
    let fields: Vec<&str> = key.split_whitespace().collect();
    match fields.as_slice() {
        [kind, _, comment @ ..] if !comment.is_empty() => {
            format!("{kind} ... {}", comment.join(" "))
        }
        [kind, _] => format!("{kind} ..."),
        _ => key.to_owned(),
    }
}
