//! Private IPv4 /30 block allocation.
//!
//! Every container owns a block of four addresses: network, host side of
//! the veth pair, container side, broadcast. The configured base address
//! marks the zeroth block, which is never handed out.

use std::fmt;
use std::net::Ipv4Addr;

use lustmolch_common::config::Settings;
use lustmolch_common::constants::{ADDRESSES_PER_BLOCK, OCTET_LIMIT};
use lustmolch_common::error::{LustmolchError, Result};
use lustmolch_common::types::strip_prefix_length;

use crate::inventory::Inventory;

/// Addresses of both ends of a container's veth pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpPair {
    /// Host side (`ve-<name>`).
    pub host: Ipv4Addr,
    /// Container side (`host0`).
    pub container: Ipv4Addr,
}

impl IpPair {
    /// Builds the pair whose container address follows `host`.
    fn from_host(host: Ipv4Addr) -> Self {
        let [a, b, c, d] = host.octets();
        Self {
            host,
            container: Ipv4Addr::new(a, b, c, d + 1),
        }
    }
}

impl fmt::Display for IpPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.host, self.container)
    }
}

/// Returns the address pair for container `name`.
///
/// A known container keeps its stored addresses (any `/prefix` suffix is
/// dropped). For a new name the highest host address among the present
/// containers and the base address is found by comparing the third octet,
/// then the fourth, numerically. The next block starts four addresses
/// later; a fourth octet reaching 254 wraps to 1 and carries into the third.
///
/// # Errors
///
/// Returns [`LustmolchError::InvalidAddress`] if a stored address does not
/// parse, and [`LustmolchError::AllocationExhausted`] once the third octet
/// would reach 254.
pub fn next_ip_pair(inventory: &Inventory, name: &str, settings: &Settings) -> Result<IpPair> {
    if let Some(existing) = inventory.container(name) {
        return Ok(IpPair {
            host: parse_stored(&existing.ip_address_host)?,
            container: parse_stored(&existing.ip_address_container)?,
        });
    }

    let [a, b, base_third, base_fourth] = settings.ip_start_host.octets();
    let mut highest = (base_third, base_fourth);
    for container in inventory.containers.values() {
        let [_, _, third, fourth] = parse_stored(&container.ip_address_host)?.octets();
        highest = highest.max((third, fourth));
    }

    let (third, fourth) = highest;
    let (third, fourth) = match fourth.checked_add(ADDRESSES_PER_BLOCK) {
        Some(next) if next < OCTET_LIMIT => (u16::from(third), next),
        _ => (u16::from(third) + 1, 1),
    };
    let third = u8::try_from(third)
        .ok()
        .filter(|t| *t < OCTET_LIMIT)
        .ok_or_else(|| {
            tracing::error!(name, "no available IP addresses left");
            LustmolchError::AllocationExhausted {
                resource: "IPv4 address blocks",
            }
        })?;

    let pair = IpPair::from_host(Ipv4Addr::new(a, b, third, fourth));
    tracing::debug!(name, %pair, "allocated address block");
    Ok(pair)
}

/// Parses a stored address, ignoring a `/prefix` suffix.
fn parse_stored(address: &str) -> Result<Ipv4Addr> {
    strip_prefix_length(address)
        .parse()
        .map_err(|_| LustmolchError::InvalidAddress {
            address: address.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use lustmolch_common::types::ContainerRecord;

    use super::*;

    fn inventory_with_hosts(hosts: &[&str]) -> Inventory {
        let mut inventory = Inventory::default();
        for (i, host) in hosts.iter().enumerate() {
            let container = strip_prefix_length(host)
                .parse::<Ipv4Addr>()
                .map(|h| IpPair::from_host(h).container.to_string())
                .unwrap_or_default();
            let _ = inventory.add_container(ContainerRecord {
                name: format!("c{i}"),
                ssh_port: 10022,
                ip_address_host: (*host).to_owned(),
                ip_address_container: container,
                ip_subnet_length: Some(30),
                url: String::new(),
                users: Vec::new(),
            });
        }
        inventory
    }

    fn allocate(hosts: &[&str]) -> Result<IpPair> {
        next_ip_pair(&inventory_with_hosts(hosts), "new", &Settings::default())
    }

    #[test]
    fn empty_inventory_skips_base_block() {
        let pair = allocate(&[]).unwrap();
        assert_eq!(pair.host, Ipv4Addr::new(192, 168, 0, 5));
        assert_eq!(pair.container, Ipv4Addr::new(192, 168, 0, 6));
    }

    #[test]
    fn next_block_follows_highest_host() {
        let pair = allocate(&["192.168.0.5", "192.168.0.9"]).unwrap();
        assert_eq!(pair.host, Ipv4Addr::new(192, 168, 0, 13));
    }

    #[test]
    fn octets_compare_numerically() {
        let pair = allocate(&["192.168.0.13", "192.168.0.9"]).unwrap();
        assert_eq!(pair.host, Ipv4Addr::new(192, 168, 0, 17));
    }

    #[test]
    fn third_octet_takes_precedence() {
        let pair = allocate(&["192.168.0.249", "192.168.1.5"]).unwrap();
        assert_eq!(pair.host, Ipv4Addr::new(192, 168, 1, 9));
    }

    #[test]
    fn fourth_octet_rolls_over_into_third() {
        let pair = allocate(&["192.168.0.253"]).unwrap();
        assert_eq!(pair.host, Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(pair.container, Ipv4Addr::new(192, 168, 1, 2));
    }

    #[test]
    fn last_block_before_rollover_is_used() {
        let pair = allocate(&["192.168.0.249"]).unwrap();
        assert_eq!(pair.host, Ipv4Addr::new(192, 168, 0, 253));
        assert_eq!(pair.container, Ipv4Addr::new(192, 168, 0, 254));
    }

    #[test]
    fn exhaustion_fails_deterministically() {
        for _ in 0..2 {
            assert!(matches!(
                allocate(&["192.168.253.253"]),
                Err(LustmolchError::AllocationExhausted { .. })
            ));
        }
    }

    #[test]
    fn prefix_suffix_is_ignored() {
        let pair = allocate(&["192.168.0.5/30"]).unwrap();
        assert_eq!(pair.host, Ipv4Addr::new(192, 168, 0, 9));
    }

    #[test]
    fn existing_name_returns_stored_addresses_without_prefix() {
        let mut inventory = inventory_with_hosts(&["192.168.0.5/30"]);
        if let Some(c) = inventory.containers.get_mut("c0") {
            c.ip_address_container = "192.168.0.6/30".into();
        }
        let pair = next_ip_pair(&inventory, "c0", &Settings::default()).unwrap();
        assert_eq!(pair.host, Ipv4Addr::new(192, 168, 0, 5));
        assert_eq!(pair.container, Ipv4Addr::new(192, 168, 0, 6));
    }

    #[test]
    fn malformed_stored_address_is_an_error() {
        assert!(matches!(
            allocate(&["192.168.0"]),
            Err(LustmolchError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn container_address_always_follows_host() {
        let mut hosts: Vec<String> = Vec::new();
        for _ in 0..100 {
            let refs: Vec<&str> = hosts.iter().map(String::as_str).collect();
            let pair = allocate(&refs).unwrap();
            let [_, _, hc, hd] = pair.host.octets();
            let [_, _, cc, cd] = pair.container.octets();
            assert_eq!((hc, hd + 1), (cc, cd));
            hosts.push(pair.host.to_string());
        }
    }
}
