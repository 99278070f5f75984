//! Station Configuration Module
//!
//! Device, service endpoints, artifact directories and hazard thresholds,
//! loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `ECOSENSE_CONFIG` environment variable (path to TOML file)
//! 2. `ecosense.toml` in the current working directory
//! 3. Built-in defaults
//!
//! CLI flags are applied on top by the binary, then [`AppConfig::validate`]
//! runs once more before anything is opened.

mod app_config;
pub mod defaults;
pub mod validation;

pub use app_config::*;
