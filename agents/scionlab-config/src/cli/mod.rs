//! CLI module
//!
//! Argument parsing, the agent's own settings, and resolution of the
//! host's config info.

pub mod args;
pub mod config;
pub mod config_info;
