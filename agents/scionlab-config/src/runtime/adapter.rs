//! Host Operations Trait
//!
//! Everything the installer does to the host outside of reading files
//! goes through `HostOps`, so reconciliation can be exercised against a
//! recording fake.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;

/// Host operations - service manager, file placement, ownership
#[async_trait]
pub trait HostOps: Send + Sync {
    /// Name of the host flavour, for logging
    fn host_type(&self) -> &str;

    /// Make the service manager re-read unit files and links
    async fn daemon_reload(&self) -> Result<()>;

    /// Enable a unit. Enabling an enabled unit is a no-op.
    async fn enable_unit(&self, unit: &str) -> Result<()>;

    /// Restart a unit (or target)
    async fn restart_unit(&self, unit: &str) -> Result<()>;

    /// Stop a unit
    async fn stop_unit(&self, unit: &str) -> Result<()>;

    /// Move a file or directory into place, replacing a file at `to`
    async fn move_path(&self, from: &Path, to: &Path) -> Result<()>;

    /// Remove a file, symlink or directory tree. Missing paths are fine.
    async fn remove_path(&self, path: &Path) -> Result<()>;

    /// Recursively hand `path` to `user:group`
    async fn chown_recursive(&self, path: &Path, user: &str, group: &str) -> Result<()>;

    /// Generate Diffie-Hellman parameters of `bits` size at `path`
    async fn generate_dh_params(&self, path: &Path, bits: u32) -> Result<()>;

    /// Whether the network interface is up
    async fn interface_up(&self, interface: &str) -> Result<bool>;
}

/// Remove whatever is at `path` without following symlinks
pub async fn remove_any(path: &Path) -> Result<()> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to stat {}", path.display()));
        }
    };

    let result = if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };

    result.with_context(|| format!("Failed to remove {}", path.display()))
}
