//! SCIONLab Host Agent Library
//!
//! This crate provides the core functionality of `scionlab-config`, the
//! agent that keeps a SCIONLab host's configuration in sync with the
//! coordinator: resolving the host's identity, fetching configuration
//! bundles, installing them, and reporting the deployed version.

pub mod agent;
pub mod cli;
pub mod connection;
pub mod error;
pub mod runtime;

#[cfg(test)]
pub(crate) mod testutil;

// Re-exports for convenience
pub use agent::deploy::{Agent, RunOutcome};
pub use agent::installer::{InstallReport, Installer};
pub use cli::config::AgentConfig;
pub use cli::config_info::ConfigInfo;
pub use connection::client::CoordinatorClient;
pub use connection::protocol::{ConfigBundle, FetchOutcome};
pub use error::AgentError;
pub use runtime::adapter::HostOps;
pub use runtime::systemd::SystemdHost;
