//! Bundle Staging
//!
//! Unpacks a configuration bundle into a private temporary directory and
//! checks it is complete before anything on the host is touched. The
//! directory is removed when the `StagedBundle` is dropped, whatever the
//! outcome of the install.

use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

use crate::connection::protocol::ConfigBundle;
use crate::error::AgentError;

/// Core network-stack configuration tree
pub const GEN_DIR: &str = "gen";
/// Units that must be wanted by the service target
pub const SERVICES_MANIFEST: &str = "scionlab-services.txt";
pub const CLIENT_CONF: &str = "client.conf";
pub const SERVER_CONF: &str = "server.conf";
/// VPN server per-client configuration directory
pub const CCD_DIR: &str = "ccd";

#[derive(Debug)]
pub struct StagedBundle {
    dir: TempDir,
    services: Vec<String>,
}

impl StagedBundle {
    /// Extract `bundle` into a fresh staging directory and validate it
    pub fn extract(bundle: &ConfigBundle) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("scionlab-config-")
            .tempdir()
            .context("Failed to create staging directory")?;

        let mut archive = bundle.archive();
        let entries = archive
            .entries()
            .context("Failed to read configuration archive")?;

        for entry in entries {
            let mut entry = entry.context("Corrupt configuration archive")?;
            let entry_path = entry
                .path()
                .context("Corrupt configuration archive")?
                .to_path_buf();

            if !is_safe_entry(&entry_path) {
                return Err(AgentError::UnsafeArchivePath(entry_path.display().to_string()).into());
            }

            entry
                .unpack_in(dir.path())
                .with_context(|| format!("Failed to extract {}", entry_path.display()))?;
        }

        debug!(staging = %dir.path().display(), "Configuration bundle extracted");

        let manifest = dir.path().join(SERVICES_MANIFEST);
        if !manifest.is_file() {
            return Err(AgentError::MissingManifest(SERVICES_MANIFEST.to_string()).into());
        }
        let content = std::fs::read_to_string(&manifest)
            .with_context(|| format!("Failed to read {}", SERVICES_MANIFEST))?;

        if !dir.path().join(GEN_DIR).is_dir() {
            return Err(AgentError::MissingGenDir(GEN_DIR.to_string()).into());
        }

        Ok(Self {
            dir,
            services: parse_services(&content),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn gen_dir(&self) -> PathBuf {
        self.dir.path().join(GEN_DIR)
    }

    pub fn services(&self) -> &[String] {
        &self.services
    }

    pub fn client_conf(&self) -> Option<PathBuf> {
        self.existing(CLIENT_CONF)
    }

    pub fn server_conf(&self) -> Option<PathBuf> {
        self.existing(SERVER_CONF)
    }

    pub fn ccd_dir(&self) -> Option<PathBuf> {
        self.existing(CCD_DIR)
    }

    fn existing(&self, name: &str) -> Option<PathBuf> {
        let path = self.dir.path().join(name);
        path.exists().then_some(path)
    }
}

/// Relative path without `..`, root or prefix components
fn is_safe_entry(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Unit names from the services manifest, one per line
pub fn parse_services(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::BundleBuilder;

    #[test]
    fn test_parse_services() {
        let services = parse_services("scion-border-router@br1.service\n\n  scion-control@cs1.service \n# comment\n");
        assert_eq!(
            services,
            vec!["scion-border-router@br1.service", "scion-control@cs1.service"]
        );
    }

    #[test]
    fn test_extract_complete_bundle() {
        let bundle = BundleBuilder::new()
            .file("gen/topology.json", "{}")
            .file(SERVICES_MANIFEST, "br1\n")
            .file(CLIENT_CONF, "client")
            .build();

        let staged = StagedBundle::extract(&bundle).unwrap();
        assert_eq!(staged.services(), ["br1"]);
        assert!(staged.gen_dir().join("topology.json").is_file());
        assert!(staged.client_conf().is_some());
        assert!(staged.server_conf().is_none());
        assert!(staged.ccd_dir().is_none());
    }

    #[test]
    fn test_staging_removed_on_drop() {
        let bundle = BundleBuilder::new()
            .file("gen/topology.json", "{}")
            .file(SERVICES_MANIFEST, "")
            .build();

        let staged = StagedBundle::extract(&bundle).unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_manifest() {
        let bundle = BundleBuilder::new().file("gen/topology.json", "{}").build();
        let err = StagedBundle::extract(&bundle).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AgentError>(),
            Some(AgentError::MissingManifest(_))
        ));
    }

    #[test]
    fn test_missing_gen() {
        let bundle = BundleBuilder::new().file(SERVICES_MANIFEST, "br1").build();
        let err = StagedBundle::extract(&bundle).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AgentError>(),
            Some(AgentError::MissingGenDir(_))
        ));
    }

    #[test]
    fn test_corrupt_archive() {
        let bundle = ConfigBundle::from_bytes(b"definitely not gzip".to_vec());
        assert!(StagedBundle::extract(&bundle).is_err());
    }

    #[test]
    fn test_unsafe_entry_paths() {
        assert!(is_safe_entry(Path::new("gen/topology.json")));
        assert!(is_safe_entry(Path::new("./client.conf")));
        assert!(!is_safe_entry(Path::new("../etc/passwd")));
        assert!(!is_safe_entry(Path::new("/etc/passwd")));
        assert!(!is_safe_entry(Path::new("gen/../../x")));
    }
}
