//! Configuration and shared helpers.

/// `triad.toml` loading, validation and credential resolution.
pub mod toml_config;

pub use toml_config::{LogFormat, TriadConfig, DEFAULT_CONFIG_FILE};
