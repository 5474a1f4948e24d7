//! Test helpers: bundle construction and scratch host layouts.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::cli::config::AgentConfig;
use crate::connection::protocol::ConfigBundle;

/// Builds gzip tar bundles in memory
#[derive(Default)]
pub struct BundleBuilder {
    entries: Vec<(String, Option<Vec<u8>>)>,
}

impl BundleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: &str, content: impl AsRef<[u8]>) -> Self {
        self.entries
            .push((path.to_string(), Some(content.as_ref().to_vec())));
        self
    }

    pub fn dir(mut self, path: &str) -> Self {
        self.entries.push((path.to_string(), None));
        self
    }

    /// A typical host bundle: core config with a state file at `version`
    /// and a services manifest
    pub fn host(version: u64, services: &str) -> Self {
        Self::new()
            .dir("gen")
            .file("gen/topology.json", format!("{{\"version\": {}}}", version))
            .file(
                "gen/scionlab-config.json",
                format!(
                    r#"{{"host_id": "host", "host_secret": "pw", "url": "http://127.0.0.1:1", "version": {}}}"#,
                    version
                ),
            )
            .file("scionlab-services.txt", services)
    }

    pub fn build(self) -> ConfigBundle {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for (path, content) in self.entries {
            let mut header = tar::Header::new_gnu();
            match content {
                Some(data) => {
                    header.set_entry_type(tar::EntryType::Regular);
                    header.set_mode(0o644);
                    header.set_size(data.len() as u64);
                    builder.append_data(&mut header, &path, &data[..]).unwrap();
                }
                None => {
                    header.set_entry_type(tar::EntryType::Directory);
                    header.set_mode(0o755);
                    header.set_size(0);
                    builder
                        .append_data(&mut header, &path, std::io::empty())
                        .unwrap();
                }
            }
        }

        let encoder = builder.into_inner().unwrap();
        ConfigBundle::from_bytes(encoder.finish().unwrap())
    }
}

/// A scratch filesystem shaped like a managed host
pub struct TestHost {
    pub root: TempDir,
    pub config: AgentConfig,
}

impl TestHost {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let mut config = AgentConfig::default();
        config.host.scion_root = root.path().join("etc/scion");
        config.host.openvpn_dir = root.path().join("etc/openvpn");
        config.host.systemd_dir = root.path().join("etc/systemd/system");
        config.vpn.ready_interval_ms = 0;

        std::fs::create_dir_all(&config.host.scion_root).unwrap();
        std::fs::create_dir_all(&config.host.openvpn_dir).unwrap();
        std::fs::create_dir_all(&config.host.systemd_dir).unwrap();

        Self { root, config }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn read(&self, relative: &str) -> Option<String> {
        std::fs::read_to_string(self.path(relative)).ok()
    }

    pub fn wants_dir(&self) -> PathBuf {
        self.config
            .host
            .systemd_dir
            .join(format!("{}.wants", self.config.host.target))
    }

    /// Names in the target's wants directory, sorted
    pub fn wanted_units(&self) -> Vec<String> {
        list_names(&self.wants_dir())
    }
}

pub fn list_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
