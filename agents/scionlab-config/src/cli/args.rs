//! Command-line arguments
//!
//! The agent is either run directly (cron, systemd timer, by hand) or
//! through a forced ssh command, in which case the real argument vector
//! arrives in `SSH_ORIGINAL_COMMAND`.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use crate::cli::config_info::ResolveOptions;
use crate::error::AgentError;

/// Program name expected as the first token of a remote command
pub const PROGRAM_NAME: &str = "scionlab-config";

/// Environment variable carrying the argv of a restricted ssh invocation
pub const REMOTE_COMMAND_ENV: &str = "SSH_ORIGINAL_COMMAND";

#[derive(Debug, Parser)]
#[command(name = "scionlab-config")]
#[command(author, version, about = "Fetch and install the SCIONLab configuration for this host")]
pub struct Args {
    /// Path to the config info file (host id, secret, url, version)
    #[arg(long, value_name = "PATH")]
    pub config_info: Option<PathBuf>,

    /// Host id, instead of reading it from the config info file
    #[arg(long)]
    pub host_id: Option<String>,

    /// Host secret, instead of reading it from the config info file
    #[arg(long)]
    pub host_secret: Option<String>,

    /// Coordinator URL, overrides the stored one
    #[arg(long)]
    pub url: Option<String>,

    /// Pretend this configuration version is installed
    #[arg(long, value_name = "VERSION", conflicts_with = "force")]
    pub local_version: Option<u64>,

    /// Fetch the configuration even if the installed version is current
    #[arg(long)]
    pub force: bool,

    /// Install from a local configuration archive instead of fetching
    #[arg(long, value_name = "PATH")]
    pub tar: Option<PathBuf>,

    /// Agent settings file (TOML)
    #[arg(long, value_name = "PATH")]
    pub agent_config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Parse from the remote command if one is set, else from the process
    /// arguments.
    pub fn from_env() -> Result<Self> {
        match std::env::var(REMOTE_COMMAND_ENV) {
            Ok(command) => Self::from_remote_command(&command),
            Err(_) => Ok(Self::parse()),
        }
    }

    /// Parse a remote command line. Its first token must name this program.
    pub fn from_remote_command(command: &str) -> Result<Self> {
        let argv: Vec<&str> = command.split_whitespace().collect();
        let first = argv.first().copied().unwrap_or_default();
        let invoked = Path::new(first)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();

        if invoked != PROGRAM_NAME {
            return Err(AgentError::ProgramNameMismatch {
                expected: PROGRAM_NAME.to_string(),
                actual: first.to_string(),
            }
            .into());
        }

        Self::try_parse_from(argv).context("Invalid arguments in remote command")
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            config_info: self.config_info.clone(),
            host_id: self.host_id.clone(),
            host_secret: self.host_secret.clone(),
            url: self.url.clone(),
            local_version: self.local_version,
            force: self.force,
        }
    }
}
