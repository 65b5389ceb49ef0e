//! Typed settings for provisioning.
//!
//! Overrides live as optional top-level keys of the inventory document and
//! are resolved once, at load time, against the defaults in
//! [`crate::constants`].

use std::net::Ipv4Addr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{LustmolchError, Result};

/// Settings keys as they appear in the inventory document.
///
/// Every field is optional; absent keys fall back to the named defaults
/// when [`SettingsOverrides::resolve`] is called.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsOverrides {
    /// Debian suite installed into new machines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debian_flavour: Option<String>,
    /// Mirror `debootstrap` downloads from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debian_mirror: Option<String>,
    /// Source networks allowed to reach container SSH ports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssn_ip_ranges: Option<Vec<String>>,
    /// Root of the shared www directories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub www_root: Option<PathBuf>,
    /// Directory holding the machine root filesystems.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machines_dir: Option<PathBuf>,
    /// First SSH port handed out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_start_port: Option<u16>,
    /// Distance between consecutive SSH ports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_port_increment: Option<u16>,
    /// Public host address used as SNAT source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
    /// Base address of the private container range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_start_host: Option<String>,
    /// Prefix length of every per-container block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_subnet_length: Option<u8>,
    /// Domain appended to container names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Directory searched for templates before the built-in set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<PathBuf>,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Debian suite installed into new machines.
    pub debian_flavour: String,
    /// Mirror `debootstrap` downloads from.
    pub debian_mirror: String,
    /// Source networks allowed to reach container SSH ports.
    pub ssn_ip_ranges: Vec<String>,
    /// Root of the shared www directories.
    pub www_root: PathBuf,
    /// Directory holding the machine root filesystems.
    pub machines_dir: PathBuf,
    /// First SSH port handed out.
    pub ssh_start_port: u16,
    /// Distance between consecutive SSH ports.
    pub ssh_port_increment: u16,
    /// Public host address used as SNAT source.
    pub host_ip: Ipv4Addr,
    /// Base address of the private container range.
    pub ip_start_host: Ipv4Addr,
    /// Prefix length of every per-container block.
    pub ip_subnet_length: u8,
    /// Domain appended to container names.
    pub domain: String,
    /// Directory searched for templates before the built-in set.
    pub template_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debian_flavour: constants::DEFAULT_DEBIAN_FLAVOUR.to_owned(),
            debian_mirror: constants::DEFAULT_DEBIAN_MIRROR.to_owned(),
            ssn_ip_ranges: constants::DEFAULT_SSN_IP_RANGES
                .iter()
                .map(|r| (*r).to_owned())
                .collect(),
            www_root: PathBuf::from(constants::DEFAULT_WWW_ROOT),
            machines_dir: PathBuf::from(constants::DEFAULT_MACHINES_DIR),
            ssh_start_port: constants::DEFAULT_SSH_START_PORT,
            ssh_port_increment: constants::DEFAULT_SSH_PORT_INCREMENT,
            host_ip: constants::DEFAULT_HOST_IP,
            ip_start_host: constants::DEFAULT_IP_START_HOST,
            ip_subnet_length: constants::DEFAULT_IP_SUBNET_LENGTH,
            domain: constants::DEFAULT_DOMAIN.to_owned(),
            template_dir: None,
        }
    }
}

impl Settings {
    /// Builds the public URL of a container.
    #[must_use]
    pub fn container_url(&self, name: &str) -> String {
        format!("{name}.{}", self.domain)
    }
}

impl SettingsOverrides {
    /// Resolves the overrides against the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`LustmolchError::Config`] if an address does not parse, the
    /// port increment is zero, or the prefix length exceeds 32.
    pub fn resolve(&self) -> Result<Settings> {
        let defaults = Settings::default();
        let ssh_port_increment = self
            .ssh_port_increment
            .unwrap_or(defaults.ssh_port_increment);
        if ssh_port_increment == 0 {
            return Err(config_err("ssh_port_increment must be greater than zero"));
        }
        let ip_subnet_length = self.ip_subnet_length.unwrap_or(defaults.ip_subnet_length);
        if ip_subnet_length > 32 {
            return Err(config_err(format!(
                "ip_subnet_length {ip_subnet_length} is not a valid IPv4 prefix length"
            )));
        }

        Ok(Settings {
            debian_flavour: self
                .debian_flavour
                .clone()
                .unwrap_or(defaults.debian_flavour),
            debian_mirror: self.debian_mirror.clone().unwrap_or(defaults.debian_mirror),
            ssn_ip_ranges: self.ssn_ip_ranges.clone().unwrap_or(defaults.ssn_ip_ranges),
            www_root: self.www_root.clone().unwrap_or(defaults.www_root),
            machines_dir: self.machines_dir.clone().unwrap_or(defaults.machines_dir),
            ssh_start_port: self.ssh_start_port.unwrap_or(defaults.ssh_start_port),
            ssh_port_increment,
            host_ip: parse_ipv4("host_ip", self.host_ip.as_deref(), defaults.host_ip)?,
            ip_start_host: parse_ipv4(
                "ip_start_host",
                self.ip_start_host.as_deref(),
                defaults.ip_start_host,
            )?,
            ip_subnet_length,
            domain: self.domain.clone().unwrap_or(defaults.domain),
            template_dir: self.template_dir.clone(),
        })
    }
}

fn parse_ipv4(key: &str, value: Option<&str>, default: Ipv4Addr) -> Result<Ipv4Addr> {
    value.map_or(Ok(default), |v| {
        v.parse()
            .map_err(|_| config_err(format!("{key} {v:?} is not an IPv4 address")))
    })
}

fn config_err(message: impl Into<String>) -> LustmolchError {
    LustmolchError::Config {
        message: message.into(),
    }
}
