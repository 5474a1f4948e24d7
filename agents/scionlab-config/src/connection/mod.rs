//! Connection module
//!
//! This module handles all communication with the coordinator: the
//! conditional configuration fetch and the deployed-version report.

pub mod client;
pub mod protocol;
