//! Where provisioned files live on the host and inside a machine.
//!
//! All absolute paths are resolved under a filesystem root, `/` in
//! production, so whole flows can be staged into a scratch directory.

use std::path::{Path, PathBuf};

use lustmolch_common::config::Settings;
use lustmolch_common::constants::BOOTSTRAP_SCRIPT_PATH;
use lustmolch_core::template;

/// A rendered template and its installation place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedFile {
    /// Template name.
    pub template: &'static str,
    /// Absolute target directory (on the host or inside the machine).
    pub dir: &'static str,
    /// Target file name; `{name}` is replaced by the container name.
    pub file_name: &'static str,
}

impl PlacedFile {
    /// Returns the target file name for container `name`.
    #[must_use]
    pub fn file_name_for(&self, name: &str) -> String {
        self.file_name.replace("{name}", name)
    }
}

/// Files placed on the host before the machine is bootstrapped.
pub const HOST_FILES: [PlacedFile; 2] = [
    PlacedFile {
        template: template::HOST_NGINX,
        dir: "/etc/nginx/sites-available",
        file_name: "{name}",
    },
    PlacedFile {
        template: template::HOST_NETWORK,
        dir: "/etc/systemd/network",
        file_name: "80-container-ve-{name}.network",
    },
];

/// The systemd-nspawn unit settings, placed after bootstrapping.
pub const NSPAWN_FILE: PlacedFile = PlacedFile {
    template: template::HOST_NSPAWN,
    dir: "/etc/systemd/nspawn",
    file_name: "{name}.nspawn",
};

/// Files placed inside the machine's root filesystem.
pub const CONTAINER_FILES: [PlacedFile; 2] = [
    PlacedFile {
        template: template::CONTAINER_SSHD,
        dir: "/etc/ssh",
        file_name: "sshd_config",
    },
    PlacedFile {
        template: template::CONTAINER_NETWORK,
        dir: "/etc/systemd/network",
        file_name: "80-container-host0.network",
    },
];

/// Resolves container paths against a filesystem root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostLayout {
    root: PathBuf,
    www_root: PathBuf,
    machines_dir: PathBuf,
}

impl HostLayout {
    /// Creates a layout rooted at `root` using the directories in `settings`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, settings: &Settings) -> Self {
        Self {
            root: root.into(),
            www_root: settings.www_root.clone(),
            machines_dir: settings.machines_dir.clone(),
        }
    }

    /// Resolves an absolute path under the layout root.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path.strip_prefix("/").unwrap_or(path))
    }

    /// Shared www directory bind-mounted into the container.
    #[must_use]
    pub fn www_dir(&self, name: &str) -> PathBuf {
        self.resolve(&self.www_root).join(name)
    }

    /// Root filesystem of the machine.
    #[must_use]
    pub fn machine_dir(&self, name: &str) -> PathBuf {
        self.resolve(&self.machines_dir).join(name)
    }

    /// Target of a host-side file for container `name`.
    #[must_use]
    pub fn host_file(&self, file: &PlacedFile, name: &str) -> PathBuf {
        self.resolve(Path::new(file.dir)).join(file.file_name_for(name))
    }

    /// Target of a file inside the machine of container `name`.
    #[must_use]
    pub fn container_file(&self, file: &PlacedFile, name: &str) -> PathBuf {
        in_machine(&self.machine_dir(name), file.dir).join(file.file_name_for(name))
    }

    /// Location of the bootstrap script as seen from the host.
    #[must_use]
    pub fn bootstrap_script(&self, name: &str) -> PathBuf {
        in_machine(&self.machine_dir(name), BOOTSTRAP_SCRIPT_PATH)
    }

    /// SSH directory of the machine's root user.
    #[must_use]
    pub fn root_ssh_dir(&self, name: &str) -> PathBuf {
        in_machine(&self.machine_dir(name), "/root/.ssh")
    }
}

fn in_machine(machine: &Path, absolute: &str) -> PathBuf {
    machine.join(absolute.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn production() -> HostLayout {
        HostLayout::new("/", &Settings::default())
    }

    #[test]
    fn host_files_use_container_name() {
        let layout = production();
        assert_eq!(
            layout.host_file(&HOST_FILES[0], "web"),
            PathBuf::from("/etc/nginx/sites-available/web")
        );
        assert_eq!(
            layout.host_file(&HOST_FILES[1], "web"),
            PathBuf::from("/etc/systemd/network/80-container-ve-web.network")
        );
        assert_eq!(
            layout.host_file(&NSPAWN_FILE, "web"),
            PathBuf::from("/etc/systemd/nspawn/web.nspawn")
        );
    }

    #[test]
    fn container_files_live_under_machine_dir() {
        let layout = production();
        assert_eq!(
            layout.container_file(&CONTAINER_FILES[0], "web"),
            PathBuf::from("/var/lib/machines/web/etc/ssh/sshd_config")
        );
        assert_eq!(
            layout.bootstrap_script("web"),
            PathBuf::from("/var/lib/machines/web/opt/bootstrap.sh")
        );
        assert_eq!(
            layout.root_ssh_dir("web"),
            PathBuf::from("/var/lib/machines/web/root/.ssh")
        );
    }

    #[test]
    fn paths_are_resolved_under_custom_root() {
        let layout = HostLayout::new("/tmp/stage", &Settings::default());
        assert_eq!(layout.www_dir("web"), PathBuf::from("/tmp/stage/var/www/web"));
        assert_eq!(
            layout.machine_dir("web"),
            PathBuf::from("/tmp/stage/var/lib/machines/web")
        );
    }
}
