//! systemd Host Module
//!
//! Provides the systemd implementation of the HostOps trait.

pub mod adapter;

pub use adapter::SystemdHost;
