//! System-wide constants and default values.

use std::net::Ipv4Addr;

/// Default location of the inventory document.
pub const DEFAULT_INVENTORY_FILE: &str = "/etc/ssn/lustmolch-containers.json";

/// Suffix appended to the inventory path to form its lock file.
pub const LOCK_SUFFIX: &str = ".lock";

/// Default Debian suite installed by `debootstrap`.
pub const DEFAULT_DEBIAN_FLAVOUR: &str = "buster";
/// Default Debian mirror passed to `debootstrap`.
pub const DEFAULT_DEBIAN_MIRROR: &str = "http://mirror.stusta.de/debian";
/// Source networks allowed to reach container SSH ports by default.
pub const DEFAULT_SSN_IP_RANGES: [&str; 2] = ["10.150.0.0/17", "141.84.69.0/24"];
/// Default root of the per-container shared www directories.
pub const DEFAULT_WWW_ROOT: &str = "/var/www";
/// Directory systemd-nspawn machines live in.
pub const DEFAULT_MACHINES_DIR: &str = "/var/lib/machines";
/// First SSH port handed out.
pub const DEFAULT_SSH_START_PORT: u16 = 10022;
/// Distance between consecutive SSH ports.
pub const DEFAULT_SSH_PORT_INCREMENT: u16 = 1000;
/// Public address of the host, used as SNAT source.
pub const DEFAULT_HOST_IP: Ipv4Addr = Ipv4Addr::new(141, 84, 69, 235);
/// Base address of the private container range.
pub const DEFAULT_IP_START_HOST: Ipv4Addr = Ipv4Addr::new(192, 168, 0, 1);
/// Prefix length of every per-container block.
pub const DEFAULT_IP_SUBNET_LENGTH: u8 = 30;
/// Domain appended to container names to build their URL.
pub const DEFAULT_DOMAIN: &str = "stusta.de";

/// Addresses reserved per container (network, host, container, broadcast).
pub const ADDRESSES_PER_BLOCK: u8 = 4;
/// Octet value at which the allocator rolls over (fourth) or gives up (third).
pub const OCTET_LIMIT: u8 = 254;

/// Port sshd listens on inside every container.
pub const CONTAINER_SSH_PORT: u16 = 22;
/// Location of the bootstrap script inside the machine.
pub const BOOTSTRAP_SCRIPT_PATH: &str = "/opt/bootstrap.sh";

/// Maximum length of a container name.
///
/// The host side of the veth pair is `ve-<name>` and Linux interface names
/// are limited to 15 bytes.
pub const MAX_CONTAINER_NAME_LENGTH: usize = 12;

/// Application name used in CLI output.
pub const APP_NAME: &str = "lustmolch";
