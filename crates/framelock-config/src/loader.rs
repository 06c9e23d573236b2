// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! Config file discovery, parsing, environment overrides and validation.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::types::FramelockConfig;
use crate::ConfigError;

const DEFAULT_FILE: &str = "framelock.toml";
const ENV_CONFIG_PATH: &str = "FRAMELOCK_CONFIG";
const ENV_NAME_PREFIX: &str = "FRAMELOCK_NAME_PREFIX";
const ENV_REGION_DIR: &str = "FRAMELOCK_REGION_DIR";
const ENV_LOG: &str = "FRAMELOCK_LOG";

/// Resolve the config file path: explicit argument, then the
/// `FRAMELOCK_CONFIG` environment variable, then `./framelock.toml`.
pub fn find_config_file(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }
    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.is_file() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }
    let cwd_default = PathBuf::from(DEFAULT_FILE);
    if cwd_default.is_file() {
        return Ok(cwd_default);
    }
    Err(ConfigError::FileNotFound(format!(
        "{DEFAULT_FILE} (cwd), ${ENV_CONFIG_PATH}"
    )))
}

/// Load, override, and validate the session configuration.
pub fn load_config(explicit: Option<&Path>) -> Result<FramelockConfig, ConfigError> {
    let path = find_config_file(explicit)?;
    let source = std::fs::read_to_string(&path)?;
    let mut config: FramelockConfig = toml::from_str(&source)?;
    apply_environment_overrides(&mut config);
    validate(&config)?;
    info!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Environment variables win over file values, the way a deployment wants.
pub fn apply_environment_overrides(config: &mut FramelockConfig) {
    if let Ok(prefix) = std::env::var(ENV_NAME_PREFIX) {
        debug!(%prefix, "overriding session.name_prefix from environment");
        config.session.name_prefix = prefix;
    }
    if let Ok(dir) = std::env::var(ENV_REGION_DIR) {
        debug!(%dir, "overriding session.region_dir from environment");
        config.session.region_dir = PathBuf::from(dir);
    }
    if let Ok(filter) = std::env::var(ENV_LOG) {
        config.logging.filter = filter;
    }
}

/// Structural checks that must hold before any region is created.
pub fn validate(config: &FramelockConfig) -> Result<(), ConfigError> {
    if config.session.name_prefix.is_empty() {
        return Err(ConfigError::InvalidValue(
            "session.name_prefix must not be empty".into(),
        ));
    }
    if !config
        .session
        .name_prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ConfigError::InvalidValue(format!(
            "session.name_prefix '{}' must be alphanumeric with '_' or '-'",
            config.session.name_prefix
        )));
    }
    if config.ipc.image_slots < 2 {
        return Err(ConfigError::InvalidValue(format!(
            "ipc.image_slots must be >= 2, got {}",
            config.ipc.image_slots
        )));
    }
    if config.ipc.poll_interval_us == 0 {
        return Err(ConfigError::InvalidValue(
            "ipc.poll_interval_us must be > 0".into(),
        ));
    }
    if config.capture.width == 0 || config.capture.height == 0 || config.capture.channels == 0 {
        return Err(ConfigError::InvalidValue(format!(
            "capture shape {}x{}x{} has a zero dimension",
            config.capture.width, config.capture.height, config.capture.channels
        )));
    }
    if config.scheduler.wait_timeout_ms == 0 {
        return Err(ConfigError::InvalidValue(
            "scheduler.wait_timeout_ms must be > 0".into(),
        ));
    }
    if config.scheduler.max_consecutive_timeouts == 0 {
        return Err(ConfigError::InvalidValue(
            "scheduler.max_consecutive_timeouts must be > 0".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use framelock_scheduler::SkipPolicy;
    use std::io::Write;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("framelock.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
[session]
name_prefix = "arena_run"

[scheduler]
skip_policy = "drop"
"#,
        );
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.session.name_prefix, "arena_run");
        assert_eq!(config.session.region_dir, PathBuf::from("/dev/shm"));
        assert_eq!(config.ipc.image_slots, 3);
        assert_eq!(config.scheduler.skip_policy, SkipPolicy::Drop);
        assert_eq!(config.capture.width, 1920);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "[session]\nname_prefiks = \"typo\"\n");
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "[ipc]\nimage_slots = 1\n");
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::InvalidValue(_))
        ));

        let path = write_config(dir.path(), "[session]\nname_prefix = \"bad/name\"\n");
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn missing_explicit_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_config(Some(&dir.path().join("missing.toml"))),
            Err(ConfigError::FileNotFound(_))
        ));
    }
}
