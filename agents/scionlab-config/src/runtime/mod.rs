//! Runtime module
//!
//! This module provides abstraction over the host the agent manages
//! through the HostOps trait, with a systemd implementation.

pub mod adapter;
pub mod systemd;

#[cfg(test)]
pub(crate) mod fake;
