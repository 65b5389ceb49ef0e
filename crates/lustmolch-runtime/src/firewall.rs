//! iptables rules forwarding a host port to a container's sshd.

use lustmolch_common::config::Settings;
use lustmolch_common::constants::CONTAINER_SSH_PORT;
use lustmolch_common::types::{ContainerRecord, strip_prefix_length};

use crate::tool::Invocation;

/// Whether rules are added or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    /// `-A`
    Append,
    /// `-D`
    Delete,
}

impl RuleAction {
    const fn flag(self) -> &'static str {
        match self {
            Self::Append => "-A",
            Self::Delete => "-D",
        }
    }
}

/// Builds the rules exposing `container`'s sshd on its host port.
///
/// Per allowed source range: an `INPUT` accept and a `PREROUTING` DNAT to
/// port 22 of the container. Once: a `POSTROUTING` SNAT of traffic leaving
/// through `ve-<name>` to the host address.
#[must_use]
pub fn ssh_forward_rules(
    action: RuleAction,
    container: &ContainerRecord,
    settings: &Settings,
) -> Vec<Invocation> {
    let port = container.ssh_port.to_string();
    let destination = format!(
        "{}:{CONTAINER_SSH_PORT}",
        strip_prefix_length(&container.ip_address_container)
    );

    let mut rules = Vec::with_capacity(settings.ssn_ip_ranges.len() * 2 + 1);
    for range in &settings.ssn_ip_ranges {
        rules.push(Invocation::new("iptables").args([
            action.flag(),
            "INPUT",
            "-p",
            "tcp",
            "-m",
            "tcp",
            "--dport",
            port.as_str(),
            "-s",
            range.as_str(),
            "-j",
            "ACCEPT",
        ]));
        rules.push(Invocation::new("iptables").args([
            "-t",
            "nat",
            action.flag(),
            "PREROUTING",
            "-p",
            "tcp",
            "-m",
            "tcp",
            "--dport",
            port.as_str(),
            "-s",
            range.as_str(),
            "-j",
            "DNAT",
            "--to-destination",
            destination.as_str(),
        ]));
    }
    rules.push(Invocation::new("iptables").args([
        "-t".to_owned(),
        "nat".to_owned(),
        action.flag().to_owned(),
        "POSTROUTING".to_owned(),
        "-o".to_owned(),
        format!("ve-{}", container.name),
        "-j".to_owned(),
        "SNAT".to_owned(),
        "--to-source".to_owned(),
        settings.host_ip.to_string(),
    ]));
    rules
}
