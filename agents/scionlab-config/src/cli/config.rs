//! Configuration module
//!
//! Handles loading the agent's own settings (host layout, coordinator
//! timeouts, logging) from an optional TOML file. Every field has a
//! default, so an absent file means a standard SCIONLab host.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for the host agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// On-host locations and unit names
    #[serde(default)]
    pub host: HostConfig,

    /// Coordinator connection settings
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    /// VPN client settings
    #[serde(default)]
    pub vpn: VpnConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where things live on the managed host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Core network-stack configuration root
    #[serde(default = "default_scion_root")]
    pub scion_root: PathBuf,

    /// Name of the generated configuration directory inside the root
    #[serde(default = "default_gen_dir")]
    pub gen_dir: String,

    /// OpenVPN configuration directory
    #[serde(default = "default_openvpn_dir")]
    pub openvpn_dir: PathBuf,

    /// systemd unit directory holding the target's wants directory
    #[serde(default = "default_systemd_dir")]
    pub systemd_dir: PathBuf,

    /// Service group whose wants set is replaced on each install
    #[serde(default = "default_target")]
    pub target: String,

    /// Owner of the installed configuration tree
    #[serde(default = "default_scion_account")]
    pub scion_user: String,

    #[serde(default = "default_scion_account")]
    pub scion_group: String,
}

/// Coordinator connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// VPN configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VpnConfig {
    #[serde(default = "default_client_unit")]
    pub client_unit: String,

    #[serde(default = "default_server_unit")]
    pub server_unit: String,

    /// Interface brought up by the VPN client
    #[serde(default = "default_interface")]
    pub interface: String,

    /// Readiness poll attempts after a client restart
    #[serde(default = "default_ready_attempts")]
    pub ready_attempts: u32,

    /// Delay between readiness polls in milliseconds
    #[serde(default = "default_ready_interval")]
    pub ready_interval_ms: u64,

    /// Diffie-Hellman parameter size for the VPN server
    #[serde(default = "default_dh_bits")]
    pub dh_bits: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (full, json, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_scion_root() -> PathBuf {
    PathBuf::from("/etc/scion")
}

fn default_gen_dir() -> String {
    "gen".to_string()
}

fn default_openvpn_dir() -> PathBuf {
    PathBuf::from("/etc/openvpn")
}

fn default_systemd_dir() -> PathBuf {
    PathBuf::from("/etc/systemd/system")
}

fn default_target() -> String {
    "scionlab.target".to_string()
}

fn default_scion_account() -> String {
    "scion".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_client_unit() -> String {
    "openvpn@client".to_string()
}

fn default_server_unit() -> String {
    "openvpn@server".to_string()
}

fn default_interface() -> String {
    "tun0".to_string()
}

fn default_ready_attempts() -> u32 {
    5
}

fn default_ready_interval() -> u64 {
    1000
}

fn default_dh_bits() -> u32 {
    2048
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "full".to_string()
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            scion_root: default_scion_root(),
            gen_dir: default_gen_dir(),
            openvpn_dir: default_openvpn_dir(),
            systemd_dir: default_systemd_dir(),
            target: default_target(),
            scion_user: default_scion_account(),
            scion_group: default_scion_account(),
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl CoordinatorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for VpnConfig {
    fn default() -> Self {
        Self {
            client_unit: default_client_unit(),
            server_unit: default_server_unit(),
            interface: default_interface(),
            ready_attempts: default_ready_attempts(),
            ready_interval_ms: default_ready_interval(),
            dh_bits: default_dh_bits(),
        }
    }
}

impl VpnConfig {
    pub fn ready_interval(&self) -> Duration {
        Duration::from_millis(self.ready_interval_ms)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read agent config file: {}", path.display()))?;

        let config: AgentConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse agent config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from `path` if given, otherwise use the built-in defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Default location of the config info file, inside the installed
    /// configuration tree
    pub fn default_config_info_path(&self) -> PathBuf {
        self.host
            .scion_root
            .join(&self.host.gen_dir)
            .join(crate::cli::config_info::CONFIG_INFO_FILE)
    }
}
