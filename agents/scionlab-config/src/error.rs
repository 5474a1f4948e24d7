//! Agent Errors
//!
//! Classified fatal conditions. Everything propagates as `anyhow::Error`;
//! these values sit at the root of the chain so callers (and tests) can
//! downcast to find out what went wrong.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("config info file {path} could not be read: {source}")]
    StateFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config info file {path} is not valid JSON: {source}")]
    StateFileMalformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config info file {path} is missing required key '{key}'")]
    MissingKey { path: PathBuf, key: &'static str },

    #[error("--host-id and --host-secret must be given together")]
    IncompleteCredentials,

    #[error(
        "no config info found at {default_path}; pass --config-info or --host-id/--host-secret"
    )]
    NoConfigInfo { default_path: PathBuf },

    #[error("unexpected response from coordinator {url}: HTTP {status}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("request to coordinator {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("configuration bundle has no services manifest '{0}'")]
    MissingManifest(String),

    #[error("configuration bundle has no '{0}/' directory")]
    MissingGenDir(String),

    #[error("configuration root {0} does not exist on this host")]
    MissingConfigRoot(PathBuf),

    #[error("configuration bundle contains unsafe path {0}")]
    UnsafeArchivePath(String),

    #[error("command `{command}` failed: {detail}")]
    CommandFailed { command: String, detail: String },

    #[error("scionlab-config must be run as root")]
    NotRoot,

    #[error("remote command must invoke {expected}, got '{actual}'")]
    ProgramNameMismatch { expected: String, actual: String },
}
