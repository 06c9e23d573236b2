// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! # framelock-config
//!
//! Type-safe TOML configuration for framelock sessions:
//! - `framelock.toml` parsing with per-field defaults
//! - environment variable overrides (`FRAMELOCK_*`)
//! - validation at load time — a config that passes here cannot take a
//!   process past startup with a structurally invalid value

pub mod loader;
pub mod types;

pub use loader::{apply_environment_overrides, find_config_file, load_config, validate};
pub use types::*;

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found (searched: {0})")]
    FileNotFound(String),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML syntax: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration value: {0}")]
    InvalidValue(String),
}
