//! Agent module
//!
//! This module contains the core agent functionality: staging and
//! installing configuration bundles, and the fetch-install-report flow.

pub mod deploy;
pub mod installer;
pub mod layout;
pub mod staging;
