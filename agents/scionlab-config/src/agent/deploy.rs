//! Deploy Flow
//!
//! One agent run: fetch the host's configuration, install it if it is
//! new, and let the coordinator know which version is now active.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::agent::installer::{InstallReport, Installer};
use crate::cli::config::AgentConfig;
use crate::cli::config_info::ConfigInfo;
use crate::connection::client::CoordinatorClient;
use crate::connection::protocol::{ConfigBundle, FetchOutcome};
use crate::runtime::adapter::HostOps;

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The installed version is current
    Unchanged,
    /// The coordinator has no configuration for this host
    Empty,
    Installed(InstallReport),
}

pub struct Agent<H: HostOps> {
    client: CoordinatorClient,
    installer: Installer<H>,
}

impl<H: HostOps> Agent<H> {
    pub fn new(config: &AgentConfig, host: Arc<H>) -> Result<Self> {
        Ok(Self {
            client: CoordinatorClient::new(&config.coordinator)?,
            installer: Installer::new(config, host),
        })
    }

    /// Fetch and, if there is something new, install and report
    pub async fn run(&self, info: &ConfigInfo) -> Result<RunOutcome> {
        match self.client.fetch(info).await? {
            FetchOutcome::Unchanged => {
                info!(version = ?info.version, "Configuration unchanged");
                Ok(RunOutcome::Unchanged)
            }
            FetchOutcome::Empty => {
                // Host deactivated on the coordinator. Services stay as
                // they are until someone decides otherwise.
                info!("No configuration assigned to this host");
                Ok(RunOutcome::Empty)
            }
            FetchOutcome::Bundle(bundle) => {
                let report = self.installer.install(&bundle).await?;
                self.report(info).await;
                Ok(RunOutcome::Installed(report))
            }
        }
    }

    /// Install from a local archive; nothing is fetched or reported
    pub async fn install_local<P: AsRef<Path>>(&self, path: P) -> Result<InstallReport> {
        let path = path.as_ref();
        info!(path = %path.display(), "Installing configuration from local archive");
        let bundle = ConfigBundle::open(path)?;
        self.installer.install(&bundle).await
    }

    /// Report the installed version to the coordinator. Best effort.
    ///
    /// The version comes from the freshly installed config info; the
    /// coordinator URL stays the one this run fetched from.
    pub async fn report(&self, fetched_with: &ConfigInfo) {
        let path = &self.installer.layout().config_info;
        let mut installed = match ConfigInfo::load(path) {
            Ok(installed) => installed,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Could not reload config info, not reporting version");
                return;
            }
        };
        installed.url = fetched_with.url.clone();

        match self.client.report_deployed_version(&installed).await {
            Ok(()) => info!(version = ?installed.version, "Reported deployed version"),
            Err(e) => warn!(error = %format!("{:#}", e), "Failed to report deployed version"),
        }
    }
}
