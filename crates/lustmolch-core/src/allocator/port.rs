//! SSH port allocation.

use lustmolch_common::config::Settings;
use lustmolch_common::error::{LustmolchError, Result};

use crate::inventory::Inventory;

/// Returns the SSH port for container `name`.
///
/// A known container keeps its stored port. For a new name the ports of
/// all present containers are scanned: if the largest is at or above
/// `ssh_start_port` the result is that port plus `ssh_port_increment`,
/// otherwise it is `ssh_start_port` itself.
///
/// # Errors
///
/// Returns [`LustmolchError::AllocationExhausted`] if the next port would
/// not fit in 16 bits.
pub fn next_ssh_port(inventory: &Inventory, name: &str, settings: &Settings) -> Result<u16> {
    if let Some(existing) = inventory.container(name) {
        return Ok(existing.ssh_port);
    }

    let highest = inventory.containers.values().map(|c| c.ssh_port).max();
    let port = match highest {
        Some(max) if max >= settings.ssh_start_port => max
            .checked_add(settings.ssh_port_increment)
            .ok_or(LustmolchError::AllocationExhausted { resource: "SSH ports" })?,
        _ => settings.ssh_start_port,
    };
    tracing::debug!(name, port, "allocated SSH port");
    Ok(port)
}

#[cfg(test)]
mod tests {
    use lustmolch_common::types::ContainerRecord;

    use super::*;

    fn inventory_with_ports(ports: &[u16]) -> Inventory {
        let mut inventory = Inventory::default();
        for (i, port) in ports.iter().enumerate() {
            let _ = inventory.add_container(ContainerRecord {
                name: format!("c{i}"),
                ssh_port: *port,
                ip_address_host: String::new(),
                ip_address_container: String::new(),
                ip_subnet_length: None,
                url: String::new(),
                users: Vec::new(),
            });
        }
        inventory
    }

    #[test]
    fn empty_inventory_starts_at_start_port() {
        let port = next_ssh_port(&Inventory::default(), "x", &Settings::default()).unwrap();
        assert_eq!(port, 10022);
    }

    #[test]
    fn new_name_gets_max_plus_increment() {
        let inventory = inventory_with_ports(&[12022, 10022, 11022]);
        let port = next_ssh_port(&inventory, "new", &Settings::default()).unwrap();
        assert_eq!(port, 13022);
    }

    #[test]
    fn existing_name_keeps_its_port() {
        let inventory = inventory_with_ports(&[10022, 11022]);
        assert_eq!(
            next_ssh_port(&inventory, "c0", &Settings::default()).unwrap(),
            10022
        );
    }

    #[test]
    fn gaps_are_not_filled() {
        let inventory = inventory_with_ports(&[10022, 14022]);
        let port = next_ssh_port(&inventory, "new", &Settings::default()).unwrap();
        assert_eq!(port, 15022);
    }

    #[test]
    fn ports_below_start_are_ignored() {
        let inventory = inventory_with_ports(&[2222]);
        let port = next_ssh_port(&inventory, "new", &Settings::default()).unwrap();
        assert_eq!(port, 10022);
    }

    #[test]
    fn overflow_is_exhaustion() {
        let inventory = inventory_with_ports(&[65022]);
        assert!(matches!(
            next_ssh_port(&inventory, "new", &Settings::default()),
            Err(LustmolchError::AllocationExhausted { .. })
        ));
    }
}
