//! Best-effort container teardown.
//!
//! Every step runs regardless of earlier failures. Failures are logged,
//! collected in a [`RemovalReport`] and never abort the flow; the inventory
//! entry is dropped at the end in any case.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use lustmolch_common::error::{LustmolchError, Result};
use lustmolch_common::types::validate_container_name;
use lustmolch_core::inventory::Inventory;

use crate::firewall::{RuleAction, ssh_forward_rules};
use crate::layout::{HOST_FILES, NSPAWN_FILE};
use crate::provision::Provisioner;
use crate::tool::Invocation;

/// A removal step that did not succeed.
#[derive(Debug)]
pub struct StepFailure {
    /// What was attempted.
    pub step: String,
    /// Why it failed.
    pub error: LustmolchError,
}

/// Outcome of [`Provisioner::remove_container`].
#[derive(Debug, Default)]
pub struct RemovalReport {
    /// Whether the container had an inventory record.
    pub was_known: bool,
    failures: Vec<StepFailure>,
}

impl RemovalReport {
    /// Steps that failed, in execution order.
    #[must_use]
    pub fn failures(&self) -> &[StepFailure] {
        &self.failures
    }

    /// Returns whether every step succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, step: impl Into<String>, outcome: Result<()>) {
        if let Err(error) = outcome {
            let step = step.into();
            tracing::warn!(step = %step, error = %error, "ignored while removing container");
            self.failures.push(StepFailure { step, error });
        }
    }
}

impl Provisioner<'_> {
    /// Tears down container `name` and drops it from `inventory`.
    ///
    /// Stops the machine, deletes its firewall rules, shared www directory,
    /// host config files and root filesystem. Files that are already gone
    /// do not count as failures. In a dry run nothing is touched.
    ///
    /// # Errors
    ///
    /// Returns [`LustmolchError::Config`] if `name` is not a valid container
    /// name. Failing steps are reported, not returned.
    pub fn remove_container(
        &self,
        inventory: &mut Inventory,
        name: &str,
    ) -> Result<RemovalReport> {
        validate_container_name(name)?;
        let record = inventory.container(name).cloned();
        let mut report = RemovalReport {
            was_known: record.is_some(),
            ..RemovalReport::default()
        };
        if record.is_none() {
            tracing::warn!(name, "container not in inventory, removing leftovers only");
        }

        tracing::info!(name, "stopping container");
        let stop = Invocation::new("machinectl").args(["stop", name]);
        if self.dry_run {
            tracing::info!(command = %stop, "would run");
        } else {
            match self.runner.run(&stop) {
                Ok(output) if !output.success() => {
                    tracing::info!(
                        name,
                        code = ?output.code,
                        "machinectl stop failed, container probably not running"
                    );
                }
                Ok(_) => {}
                Err(e) => report.record("stop container", Err(e)),
            }
        }

        if let Some(record) = &record {
            tracing::info!(name, "removing iptables rules (filter, nat)");
            for rule in ssh_forward_rules(RuleAction::Delete, record, self.settings) {
                report.record(format!("run {rule}"), self.run(&rule));
            }
        }

        let www_dir = self.layout.www_dir(name);
        tracing::info!(path = %www_dir.display(), "removing shared www directory");
        report.record("remove www directory", self.remove_path(&www_dir));

        for file in HOST_FILES.iter().chain([&NSPAWN_FILE]) {
            let path = self.layout.host_file(file, name);
            tracing::info!(path = %path.display(), "removing config file");
            report.record(format!("remove {}", path.display()), self.remove_path(&path));
        }

        let machine_dir = self.layout.machine_dir(name);
        tracing::info!(path = %machine_dir.display(), "removing machine");
        report.record("remove machine directory", self.remove_path(&machine_dir));

        if !self.dry_run {
            let _ = inventory.remove_container(name);
        }
        if report.is_clean() {
            tracing::info!(name, "container removed");
        } else {
            tracing::warn!(
                name,
                failures = report.failures.len(),
                "container removed with errors"
            );
        }
        Ok(report)
    }

    fn remove_path(&self, path: &Path) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }
        let outcome = match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
            Ok(_) => fs::remove_file(path),
            Err(e) => Err(e),
        };
        match outcome {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "already absent");
                Ok(())
            }
            other => other.map_err(|e| LustmolchError::io(path, e)),
        }
    }
}
