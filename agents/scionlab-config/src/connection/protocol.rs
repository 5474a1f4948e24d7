//! Coordinator Protocol
//!
//! Endpoints of the coordinator's host API and the values exchanged
//! with it.

use anyhow::{Context, Result};
use bytes::Bytes;
use flate2::read::GzDecoder;
use std::path::Path;

/// Path of the configuration endpoint for `host_id`
pub fn config_path(host_id: &str) -> String {
    format!("/api/host/{}/config", host_id)
}

/// Path of the deployed-version acknowledgement endpoint for `host_id`
pub fn deployed_version_path(host_id: &str) -> String {
    format!("/api/host/{}/deployed_config_version", host_id)
}

/// Join a coordinator base URL and an API path without doubling slashes
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Result of a conditional configuration fetch
#[derive(Debug)]
pub enum FetchOutcome {
    /// 304: the installed version is current
    Unchanged,
    /// 204: no configuration is assigned to this host
    Empty,
    /// A new configuration bundle
    Bundle(ConfigBundle),
}

/// A gzip-compressed tar archive of host configuration, not yet extracted
#[derive(Debug, Clone)]
pub struct ConfigBundle {
    data: Bytes,
}

impl ConfigBundle {
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Read a bundle from a local archive file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read configuration archive: {}", path.display()))?;
        Ok(Self::from_bytes(data))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Open the archive for reading
    pub fn archive(&self) -> tar::Archive<GzDecoder<&[u8]>> {
        tar::Archive::new(GzDecoder::new(&self.data[..]))
    }
}
