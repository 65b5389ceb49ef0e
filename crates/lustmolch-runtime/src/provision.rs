//! Container creation.
//!
//! Creation is a straight sequence of file placements and tool runs that
//! stops at the first failure. Nothing already placed is rolled back; the
//! inventory is only updated once every step succeeded.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use lustmolch_common::config::Settings;
use lustmolch_common::constants::BOOTSTRAP_SCRIPT_PATH;
use lustmolch_common::error::{LustmolchError, Result};
use lustmolch_common::types::{ContainerRecord, validate_container_name};
use lustmolch_core::allocator::{next_ip_pair, next_ssh_port};
use lustmolch_core::inventory::Inventory;
use lustmolch_core::template::{self, Context, Renderer};

use crate::firewall::{RuleAction, ssh_forward_rules};
use crate::layout::{CONTAINER_FILES, HOST_FILES, HostLayout, NSPAWN_FILE, PlacedFile};
use crate::tool::{Invocation, ToolRunner, run_checked};

/// Tools that must be on `PATH` before a machine is created.
pub const REQUIRED_TOOLS: [&str; 4] = ["debootstrap", "systemd-nspawn", "machinectl", "iptables"];

const BOOTSTRAP_SCRIPT_MODE: u32 = 0o755;

/// Drives the creation, removal and key distribution flows.
pub struct Provisioner<'a> {
    pub(crate) settings: &'a Settings,
    pub(crate) layout: HostLayout,
    pub(crate) renderer: Renderer,
    pub(crate) runner: &'a dyn ToolRunner,
    pub(crate) dry_run: bool,
}

impl<'a> Provisioner<'a> {
    /// Creates a provisioner placing files under `root`.
    #[must_use]
    pub fn new(
        settings: &'a Settings,
        root: impl Into<PathBuf>,
        runner: &'a dyn ToolRunner,
    ) -> Self {
        Self {
            settings,
            layout: HostLayout::new(root, settings),
            renderer: Renderer::new(settings.template_dir.clone()),
            runner,
            dry_run: false,
        }
    }

    /// Only log what would be done, builder style.
    #[must_use]
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Returns the host layout in use.
    #[must_use]
    pub const fn layout(&self) -> &HostLayout {
        &self.layout
    }

    /// Provisions container `name` and records it in `inventory`.
    ///
    /// An existing record is reused, keeping its allocation and access list,
    /// and its firewall rules are not appended a second time.
    /// In a dry run every template is still rendered but nothing is written,
    /// executed or recorded.
    ///
    /// # Errors
    ///
    /// Returns the first failing step: an invalid name, a missing tool, an
    /// exhausted allocation, a template or filesystem error, or a tool that
    /// exited non-zero.
    pub fn create_container(
        &self,
        inventory: &mut Inventory,
        name: &str,
    ) -> Result<ContainerRecord> {
        validate_container_name(name)?;
        if self.dry_run {
            tracing::info!(name, "doing a dry run");
        }
        let existed = inventory.container(name).is_some();
        if existed {
            tracing::warn!(name, "container already in inventory, reusing its allocation");
        }
        if !self.dry_run {
            for tool in REQUIRED_TOOLS {
                self.runner.ensure_available(tool)?;
            }
        }

        let record = self.allocate(inventory, name)?;
        let context = Context::for_container(&record, self.settings);
        tracing::info!(
            name,
            ssh_port = record.ssh_port,
            host = %record.ip_address_host,
            container = %record.ip_address_container,
            url = %record.url,
            "generated container context"
        );

        let www_dir = self.layout.www_dir(name);
        tracing::info!(path = %www_dir.display(), "creating shared www directory");
        if !self.dry_run {
            fs::create_dir_all(&www_dir).map_err(|e| LustmolchError::io(&www_dir, e))?;
        }

        for file in &HOST_FILES {
            self.place(file, &self.layout.host_file(file, name), &context)?;
        }

        let machine_dir = self.layout.machine_dir(name);
        tracing::info!(path = %machine_dir.display(), "running debootstrap");
        self.run(&Invocation::new("debootstrap").args([
            self.settings.debian_flavour.clone(),
            machine_dir.display().to_string(),
            self.settings.debian_mirror.clone(),
        ]))?;

        tracing::info!(name, "bootstrapping container");
        self.install_bootstrap_script(name)?;
        self.run(
            &Invocation::new("systemd-nspawn")
                .arg("-D")
                .arg(machine_dir.display().to_string())
                .arg(BOOTSTRAP_SCRIPT_PATH),
        )?;

        tracing::info!(name, "installing systemd-nspawn config");
        self.place(&NSPAWN_FILE, &self.layout.host_file(&NSPAWN_FILE, name), &context)?;

        tracing::info!(name, "copying config files into container");
        for file in &CONTAINER_FILES {
            self.place(file, &self.layout.container_file(file, name), &context)?;
        }

        // A recorded container only exists after its rules were appended.
        if existed {
            tracing::info!(name, "iptables rules already in place, not appending again");
        } else {
            tracing::info!(name, "updating iptables rules (filter, nat)");
            for rule in ssh_forward_rules(RuleAction::Append, &record, self.settings) {
                self.run(&rule)?;
            }
        }

        tracing::info!(name, "starting container");
        self.run(&Invocation::new("machinectl").args(["start", name]))?;

        if self.dry_run {
            tracing::info!(name, "dry run, inventory left unchanged");
        } else {
            let _ = inventory.add_container(record.clone());
        }
        tracing::info!(
            ssh_port = record.ssh_port,
            "all done, ssh server running; run \"iptables-save\" to persist the firewall rules"
        );
        Ok(record)
    }

    fn allocate(&self, inventory: &Inventory, name: &str) -> Result<ContainerRecord> {
        let pair = next_ip_pair(inventory, name, self.settings)?;
        let ssh_port = next_ssh_port(inventory, name, self.settings)?;
        let existing = inventory.container(name);
        Ok(ContainerRecord {
            name: name.to_owned(),
            ssh_port,
            ip_address_host: pair.host.to_string(),
            ip_address_container: pair.container.to_string(),
            ip_subnet_length: Some(
                existing
                    .and_then(|c| c.ip_subnet_length)
                    .unwrap_or(self.settings.ip_subnet_length),
            ),
            url: existing.map_or_else(|| self.settings.container_url(name), |c| c.url.clone()),
            users: existing.map(|c| c.users.clone()).unwrap_or_default(),
        })
    }

    fn install_bootstrap_script(&self, name: &str) -> Result<()> {
        let source = self.renderer.source(template::BOOTSTRAP_SCRIPT)?;
        let target = self.layout.bootstrap_script(name);
        tracing::info!(path = %target.display(), "placing bootstrap script");
        if self.dry_run {
            return Ok(());
        }
        write_file(&target, &source)?;
        fs::set_permissions(&target, fs::Permissions::from_mode(BOOTSTRAP_SCRIPT_MODE))
            .map_err(|e| LustmolchError::io(&target, e))
    }

    /// Renders `file` and writes it to `target` unless this is a dry run.
    fn place(&self, file: &PlacedFile, target: &Path, context: &Context) -> Result<()> {
        let rendered = self.renderer.render(file.template, context)?;
        tracing::info!(path = %target.display(), template = file.template, "placing config file");
        if self.dry_run {
            return Ok(());
        }
        write_file(target, &rendered)
    }

    /// Runs `invocation`, failing on a non-zero exit.
    pub(crate) fn run(&self, invocation: &Invocation) -> Result<()> {
        if self.dry_run {
            tracing::info!(command = %invocation, "would run");
            return Ok(());
        }
        let _ = run_checked(self.runner, invocation)?;
        Ok(())
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| LustmolchError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| LustmolchError::io(path, e))
}
