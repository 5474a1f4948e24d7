//! Recording HostOps for tests.
//!
//! File placement really happens (inside the test's scratch directory) so
//! the installer's comparisons see real state; service-manager calls are
//! only recorded, except that enabling a unit drops a link in the wants
//! directory like `systemctl enable` would.

use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

use crate::runtime::adapter::{remove_any, HostOps};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    DaemonReload,
    Enable(String),
    Restart(String),
    Stop(String),
    Move { from: PathBuf, to: PathBuf },
    Remove(PathBuf),
    Chown { path: PathBuf, owner: String },
    GenerateDh { path: PathBuf, bits: u32 },
    InterfaceCheck(String),
}

pub struct FakeHost {
    wants_dir: PathBuf,
    calls: Mutex<Vec<HostCall>>,
    /// Interface checks report up from this attempt on (1-based)
    interface_up_at: Option<u32>,
    interface_checks: Mutex<u32>,
    failing_unit: Option<String>,
}

impl FakeHost {
    pub fn new(wants_dir: impl Into<PathBuf>) -> Self {
        Self {
            wants_dir: wants_dir.into(),
            calls: Mutex::new(Vec::new()),
            interface_up_at: Some(1),
            interface_checks: Mutex::new(0),
            failing_unit: None,
        }
    }

    pub fn with_interface_up_at(mut self, attempt: Option<u32>) -> Self {
        self.interface_up_at = attempt;
        self
    }

    /// Make restarts of `unit` fail
    pub fn with_failing_unit(mut self, unit: &str) -> Self {
        self.failing_unit = Some(unit.to_string());
        self
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    pub fn restarts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::Restart(unit) => Some(unit),
                _ => None,
            })
            .collect()
    }

    pub fn stops(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::Stop(unit) => Some(unit),
                _ => None,
            })
            .collect()
    }

    pub fn generated_dh(&self) -> bool {
        self.calls()
            .iter()
            .any(|call| matches!(call, HostCall::GenerateDh { .. }))
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl HostOps for FakeHost {
    fn host_type(&self) -> &str {
        "fake"
    }

    async fn daemon_reload(&self) -> Result<()> {
        self.record(HostCall::DaemonReload);
        Ok(())
    }

    async fn enable_unit(&self, unit: &str) -> Result<()> {
        self.record(HostCall::Enable(unit.to_string()));
        std::fs::create_dir_all(&self.wants_dir)?;
        let link = self.wants_dir.join(unit);
        if std::fs::symlink_metadata(&link).is_err() {
            std::os::unix::fs::symlink(Path::new("/lib/systemd/system").join(unit), link)?;
        }
        Ok(())
    }

    async fn restart_unit(&self, unit: &str) -> Result<()> {
        self.record(HostCall::Restart(unit.to_string()));
        if self.failing_unit.as_deref() == Some(unit) {
            bail!("Job for {} failed", unit);
        }
        Ok(())
    }

    async fn stop_unit(&self, unit: &str) -> Result<()> {
        self.record(HostCall::Stop(unit.to_string()));
        Ok(())
    }

    async fn move_path(&self, from: &Path, to: &Path) -> Result<()> {
        self.record(HostCall::Move {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        });
        std::fs::rename(from, to)?;
        Ok(())
    }

    async fn remove_path(&self, path: &Path) -> Result<()> {
        self.record(HostCall::Remove(path.to_path_buf()));
        remove_any(path).await
    }

    async fn chown_recursive(&self, path: &Path, user: &str, group: &str) -> Result<()> {
        self.record(HostCall::Chown {
            path: path.to_path_buf(),
            owner: format!("{}:{}", user, group),
        });
        Ok(())
    }

    async fn generate_dh_params(&self, path: &Path, bits: u32) -> Result<()> {
        self.record(HostCall::GenerateDh {
            path: path.to_path_buf(),
            bits,
        });
        std::fs::write(path, "-----BEGIN DH PARAMETERS-----\n")?;
        Ok(())
    }

    async fn interface_up(&self, interface: &str) -> Result<bool> {
        self.record(HostCall::InterfaceCheck(interface.to_string()));
        let mut checks = self.interface_checks.lock();
        *checks += 1;
        Ok(self.interface_up_at.map_or(false, |at| *checks >= at))
    }
}
