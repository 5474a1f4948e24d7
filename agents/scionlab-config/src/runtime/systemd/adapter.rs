//! systemd Host
//!
//! Implementation of HostOps for a systemd host, shelling out to
//! `systemctl`, `mv`, `chown`, `openssl` and `ip`.

use anyhow::Result;
use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::error::AgentError;
use crate::runtime::adapter::{remove_any, HostOps};

/// systemd host operations
#[derive(Debug, Default)]
pub struct SystemdHost;

impl SystemdHost {
    pub fn new() -> Self {
        Self
    }

    /// Run a command to completion, failing on a non-zero exit
    async fn run<I, S>(program: &str, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        let command = std::iter::once(program.to_string())
            .chain(args.iter().map(|a| a.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ");
        debug!(command = %command, "Running host command");

        let output = Command::new(program)
            .args(&args)
            .output()
            .await
            .map_err(|e| AgentError::CommandFailed {
                command: command.clone(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = match stderr.trim() {
                "" => output.status.to_string(),
                msg => msg.to_string(),
            };
            return Err(AgentError::CommandFailed { command, detail }.into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn systemctl(args: &[&str]) -> Result<()> {
        Self::run("systemctl", args).await.map(|_| ())
    }
}

/// Whether `ip -o link show` output reports the link administratively up
pub fn link_is_up(ip_output: &str) -> bool {
    ip_output
        .split_once('<')
        .and_then(|(_, rest)| rest.split_once('>'))
        .map(|(flags, _)| flags.split(',').any(|flag| flag == "UP"))
        .unwrap_or(false)
}

#[async_trait]
impl HostOps for SystemdHost {
    fn host_type(&self) -> &str {
        "systemd"
    }

    async fn daemon_reload(&self) -> Result<()> {
        Self::systemctl(&["daemon-reload"]).await
    }

    async fn enable_unit(&self, unit: &str) -> Result<()> {
        Self::systemctl(&["enable", unit]).await
    }

    async fn restart_unit(&self, unit: &str) -> Result<()> {
        Self::systemctl(&["restart", unit]).await
    }

    async fn stop_unit(&self, unit: &str) -> Result<()> {
        Self::systemctl(&["stop", unit]).await
    }

    async fn move_path(&self, from: &Path, to: &Path) -> Result<()> {
        // `mv` copes with staging and target living on different filesystems
        let args: [&OsStr; 4] = ["-f".as_ref(), "-T".as_ref(), from.as_os_str(), to.as_os_str()];
        Self::run("mv", args).await.map(|_| ())
    }

    async fn remove_path(&self, path: &Path) -> Result<()> {
        remove_any(path).await
    }

    async fn chown_recursive(&self, path: &Path, user: &str, group: &str) -> Result<()> {
        let owner = format!("{}:{}", user, group);
        let args: [&OsStr; 3] = ["-R".as_ref(), owner.as_ref(), path.as_os_str()];
        Self::run("chown", args).await.map(|_| ())
    }

    async fn generate_dh_params(&self, path: &Path, bits: u32) -> Result<()> {
        let bits = bits.to_string();
        let args: [&OsStr; 4] = [
            "dhparam".as_ref(),
            "-out".as_ref(),
            path.as_os_str(),
            bits.as_ref(),
        ];
        Self::run("openssl", args).await.map(|_| ())
    }

    async fn interface_up(&self, interface: &str) -> Result<bool> {
        match Self::run("ip", ["-o", "link", "show", "dev", interface]).await {
            Ok(output) => Ok(link_is_up(&output)),
            // `ip` exits non-zero while the device does not exist yet
            Err(e) => {
                debug!(interface, error = %e, "Interface not present");
                Ok(false)
            }
        }
    }
}
