//! Config Info
//!
//! Identity, credentials and last-applied version of this host. Loaded
//! from the JSON state file the coordinator ships inside every bundle,
//! with command-line overrides applied on top.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::AgentError;

/// File name of the state file inside the generated configuration tree
pub const CONFIG_INFO_FILE: &str = "scionlab-config.json";

/// Coordinator used when neither the state file nor `--url` names one
pub const DEFAULT_COORDINATOR_URL: &str = "https://www.scionlab.org";

/// Identity + credentials + last-known-applied version of this host.
///
/// `version == None` means "unknown": the next fetch is unconditional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigInfo {
    pub host_id: String,
    pub host_secret: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

/// State file as found on disk; required keys are checked by hand so the
/// diagnostic can name the one that is missing.
#[derive(Deserialize)]
struct RawConfigInfo {
    host_id: Option<String>,
    host_secret: Option<String>,
    url: Option<String>,
    version: Option<u64>,
}

/// Command-line inputs relevant to resolving the config info
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub config_info: Option<PathBuf>,
    pub host_id: Option<String>,
    pub host_secret: Option<String>,
    pub url: Option<String>,
    pub local_version: Option<u64>,
    pub force: bool,
}

impl ConfigInfo {
    pub fn new(host_id: impl Into<String>, host_secret: impl Into<String>) -> Self {
        Self {
            host_id: host_id.into(),
            host_secret: host_secret.into(),
            url: DEFAULT_COORDINATOR_URL.to_string(),
            version: None,
        }
    }

    /// Load the state file at `path`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| {
            AgentError::StateFileUnreadable {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let raw: RawConfigInfo =
            serde_json::from_str(&content).map_err(|source| AgentError::StateFileMalformed {
                path: path.to_path_buf(),
                source,
            })?;

        let missing = |key| AgentError::MissingKey {
            path: path.to_path_buf(),
            key,
        };

        Ok(Self {
            host_id: raw.host_id.ok_or_else(|| missing("host_id"))?,
            host_secret: raw.host_secret.ok_or_else(|| missing("host_secret"))?,
            url: raw
                .url
                .unwrap_or_else(|| DEFAULT_COORDINATOR_URL.to_string()),
            version: raw.version,
        })
    }

    /// Write the state file to `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize config info")?;

        std::fs::write(path.as_ref(), content).with_context(|| {
            format!(
                "Failed to write config info file: {}",
                path.as_ref().display()
            )
        })?;

        Ok(())
    }

    /// Build the config info for this invocation.
    ///
    /// An explicit state file wins, then explicit credentials, then the
    /// state file at `default_path`. Overrides from `options` are applied
    /// to whichever source was used.
    pub fn resolve(options: &ResolveOptions, default_path: &Path) -> Result<Self> {
        let mut info = if let Some(path) = &options.config_info {
            Self::load(path)?
        } else if options.host_id.is_some() || options.host_secret.is_some() {
            match (&options.host_id, &options.host_secret) {
                (Some(id), Some(secret)) => Self::new(id.clone(), secret.clone()),
                _ => return Err(AgentError::IncompleteCredentials.into()),
            }
        } else if default_path.exists() {
            Self::load(default_path)?
        } else {
            return Err(AgentError::NoConfigInfo {
                default_path: default_path.to_path_buf(),
            }
            .into());
        };

        if let Some(url) = &options.url {
            info.url = url.clone();
        }
        if options.force {
            info.version = None;
        } else if let Some(version) = options.local_version {
            info.version = Some(version);
        }

        debug!(
            host_id = %info.host_id,
            url = %info.url,
            version = ?info.version,
            "Config info resolved"
        );

        Ok(info)
    }

    /// Query parameters for a conditional fetch
    pub fn version_query(&self) -> Vec<(&'static str, String)> {
        self.version
            .map(|v| vec![("version", v.to_string())])
            .unwrap_or_default()
    }
}
