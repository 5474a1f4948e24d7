//! Installer
//!
//! Reconciles a configuration bundle against the host. Steps run in a
//! fixed order: VPN client, enabled services, core configuration, VPN
//! server, then the config info commit. Any failure aborts the install
//! before the new version is recorded on disk.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::agent::layout::HostLayout;
use crate::agent::staging::StagedBundle;
use crate::cli::config::{AgentConfig, VpnConfig};
use crate::cli::config_info::{ConfigInfo, CONFIG_INFO_FILE};
use crate::connection::protocol::ConfigBundle;
use crate::error::AgentError;
use crate::runtime::adapter::HostOps;

/// Name under which the bundle's config info waits in staging
const HELD_CONFIG_INFO: &str = "scionlab-config.json.held";

/// What happened to a single managed file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileChange {
    /// Identical to the bundle, or absent from both
    #[default]
    Unchanged,
    Replaced,
    Removed,
}

/// Summary of an install
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub client: FileChange,
    pub server: FileChange,
    pub units: Vec<String>,
    pub dh_generated: bool,
    /// Version recorded in the installed config info, if any
    pub version: Option<u64>,
}

enum Plan {
    Keep,
    Replace(PathBuf),
    Remove,
}

/// Installs configuration bundles onto the host
pub struct Installer<H: HostOps> {
    host: Arc<H>,
    layout: HostLayout,
    vpn: VpnConfig,
}

impl<H: HostOps> Installer<H> {
    pub fn new(config: &AgentConfig, host: Arc<H>) -> Self {
        Self {
            host,
            layout: HostLayout::new(&config.host),
            vpn: config.vpn.clone(),
        }
    }

    pub fn layout(&self) -> &HostLayout {
        &self.layout
    }

    /// Install `bundle`. Re-installing the same bundle does not touch the
    /// VPN configuration or restart the VPN services.
    pub async fn install(&self, bundle: &ConfigBundle) -> Result<InstallReport> {
        let staged = StagedBundle::extract(bundle)?;

        if !self.layout.scion_root.is_dir() {
            return Err(AgentError::MissingConfigRoot(self.layout.scion_root.clone()).into());
        }

        info!(host = self.host.host_type(), "Installing configuration");

        let client = self.install_vpn_client(&staged).await?;
        let units = self.install_services(&staged).await?;
        let held = self.install_gen(&staged).await?;
        let (server, dh_generated) = self.install_vpn_server(&staged).await?;
        let version = self.commit_config_info(held).await?;

        let report = InstallReport {
            client,
            server,
            units,
            dh_generated,
            version,
        };

        info!(
            version = ?report.version,
            client = ?report.client,
            server = ?report.server,
            units = report.units.len(),
            "Configuration installed"
        );

        Ok(report)
    }

    async fn install_vpn_client(&self, staged: &StagedBundle) -> Result<FileChange> {
        let unit = &self.vpn.client_unit;
        let installed = &self.layout.client_conf;

        match plan(staged.client_conf(), installed).await? {
            Plan::Keep => {
                debug!("VPN client configuration unchanged");
                Ok(FileChange::Unchanged)
            }
            Plan::Remove => {
                info!(unit = %unit, "Removing VPN client configuration");
                self.host.remove_path(installed).await?;
                self.host.stop_unit(unit).await?;
                Ok(FileChange::Removed)
            }
            Plan::Replace(staged_conf) => {
                info!(unit = %unit, "Installing VPN client configuration");
                self.host.move_path(&staged_conf, installed).await?;
                self.host.restart_unit(unit).await?;
                self.wait_for_vpn_interface().await;
                Ok(FileChange::Replaced)
            }
        }
    }

    /// Poll the VPN interface after a client restart. Not coming up in
    /// time is only worth a warning.
    async fn wait_for_vpn_interface(&self) -> bool {
        let interface = &self.vpn.interface;
        for attempt in 1..=self.vpn.ready_attempts {
            match self.host.interface_up(interface).await {
                Ok(true) => {
                    debug!(interface = %interface, attempt, "VPN interface up");
                    return true;
                }
                Ok(false) => {}
                Err(e) => debug!(interface = %interface, error = %e, "Interface check failed"),
            }
            if attempt < self.vpn.ready_attempts {
                tokio::time::sleep(self.vpn.ready_interval()).await;
            }
        }

        warn!(
            interface = %interface,
            attempts = self.vpn.ready_attempts,
            "VPN interface did not come up"
        );
        false
    }

    /// Replace the target's wants set with the manifest's units
    async fn install_services(&self, staged: &StagedBundle) -> Result<Vec<String>> {
        let wants = &self.layout.wants_dir;

        if wants.is_dir() {
            let entries = std::fs::read_dir(wants)
                .with_context(|| format!("Failed to list {}", wants.display()))?;
            for entry in entries {
                let entry = entry.with_context(|| format!("Failed to list {}", wants.display()))?;
                self.host.remove_path(&entry.path()).await?;
            }
        }

        self.host.daemon_reload().await?;

        for unit in staged.services() {
            debug!(unit = %unit, "Enabling unit");
            self.host.enable_unit(unit).await?;
        }

        Ok(staged.services().to_vec())
    }

    /// Swap in the core configuration tree and restart the service group.
    ///
    /// The bundle's config info is held back and the installed one carried
    /// over, so the recorded version only moves at commit. Returns the
    /// held file, if the bundle had one.
    async fn install_gen(&self, staged: &StagedBundle) -> Result<Option<PathBuf>> {
        let staged_gen = staged.gen_dir();
        let staged_info = staged_gen.join(CONFIG_INFO_FILE);

        let held = if staged_info.is_file() {
            let held = staged.path().join(HELD_CONFIG_INFO);
            std::fs::rename(&staged_info, &held).context("Failed to stage config info")?;
            Some(held)
        } else {
            None
        };

        if self.layout.config_info.is_file() {
            std::fs::copy(&self.layout.config_info, &staged_info)
                .context("Failed to carry over installed config info")?;
        }

        let installed = &self.layout.gen_dir;
        info!(path = %installed.display(), "Installing core configuration");
        self.host.remove_path(installed).await?;
        self.host.move_path(&staged_gen, installed).await?;
        self.host
            .chown_recursive(installed, &self.layout.scion_user, &self.layout.scion_group)
            .await?;

        // TODO: diff the old and new tree and reload only the affected units
        self.host.restart_unit(&self.layout.target).await?;

        Ok(held)
    }

    async fn install_vpn_server(&self, staged: &StagedBundle) -> Result<(FileChange, bool)> {
        let unit = &self.vpn.server_unit;
        let installed = &self.layout.server_conf;
        let staged_conf = staged.server_conf();

        let plan = plan(staged_conf.clone(), installed).await?;

        if staged_conf.is_some() {
            self.host.remove_path(&self.layout.ccd_dir).await?;
            if let Some(ccd) = staged.ccd_dir() {
                self.host.move_path(&ccd, &self.layout.ccd_dir).await?;
            }
        }

        match plan {
            Plan::Keep => {
                debug!("VPN server configuration unchanged");
                Ok((FileChange::Unchanged, false))
            }
            Plan::Remove => {
                info!(unit = %unit, "Removing VPN server configuration");
                self.host.remove_path(installed).await?;
                self.host.stop_unit(unit).await?;
                Ok((FileChange::Removed, false))
            }
            Plan::Replace(staged_conf) => {
                info!(unit = %unit, "Installing VPN server configuration");
                self.host.move_path(&staged_conf, installed).await?;

                let dh_generated = if self.layout.dh_params.exists() {
                    false
                } else {
                    info!(bits = self.vpn.dh_bits, "Generating Diffie-Hellman parameters");
                    self.host
                        .generate_dh_params(&self.layout.dh_params, self.vpn.dh_bits)
                        .await?;
                    true
                };

                self.host.restart_unit(unit).await?;
                Ok((FileChange::Replaced, dh_generated))
            }
        }
    }

    /// Move the bundle's config info into the installed tree
    async fn commit_config_info(&self, held: Option<PathBuf>) -> Result<Option<u64>> {
        let installed = &self.layout.config_info;

        if let Some(held) = held {
            self.host.move_path(&held, installed).await?;
            self.host
                .chown_recursive(installed, &self.layout.scion_user, &self.layout.scion_group)
                .await?;
        }

        if !installed.is_file() {
            return Ok(None);
        }
        Ok(ConfigInfo::load(installed)?.version)
    }
}

/// Decide what to do with an installed file given its staged counterpart
async fn plan(staged: Option<PathBuf>, installed: &Path) -> Result<Plan> {
    let current = match tokio::fs::read(installed).await {
        Ok(content) => Some(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", installed.display()));
        }
    };

    match (staged, current) {
        (None, None) => Ok(Plan::Keep),
        (None, Some(_)) => Ok(Plan::Remove),
        (Some(staged), None) => Ok(Plan::Replace(staged)),
        (Some(staged), Some(current)) => {
            let new = tokio::fs::read(&staged)
                .await
                .with_context(|| format!("Failed to read {}", staged.display()))?;
            if new == current {
                Ok(Plan::Keep)
            } else {
                Ok(Plan::Replace(staged))
            }
        }
    }
}
