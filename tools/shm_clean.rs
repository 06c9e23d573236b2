// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

/*!
Stale Region Cleaner

Removes leaked shared-memory region files left behind by a crashed session.
Regions are normally unlinked by their owner on exit; after a hard kill the
backing files stay in the region directory and block the next session from
creating regions under the same names.

Usage:
  cargo run --bin framelock-shm-clean [config.toml] [--dry-run]

The prefix and region directory come from the configuration (or its
defaults when no file is given). Only files matching `<prefix>*.bin` are
touched.
*/

use anyhow::{Context, Result};
use tracing::{info, warn};

use framelock::config::{load_config, ConfigError, FramelockConfig};

fn main() -> Result<()> {
    let mut config_arg = None;
    let mut dry_run = false;
    for arg in std::env::args().skip(1) {
        if arg == "--dry-run" {
            dry_run = true;
        } else {
            config_arg = Some(std::path::PathBuf::from(arg));
        }
    }

    let config = match load_config(config_arg.as_deref()) {
        Ok(config) => config,
        Err(ConfigError::FileNotFound(_)) if config_arg.is_none() => FramelockConfig::default(),
        Err(e) => return Err(e).context("failed to load configuration"),
    };
    framelock::logging::init(&config.logging.filter);

    let dir = &config.session.region_dir;
    let prefix = &config.session.name_prefix;
    info!(dir = %dir.display(), prefix, dry_run, "scanning for stale regions");

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("cannot read region directory {}", dir.display()))?;

    let mut removed = 0usize;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with(prefix.as_str()) || !name.ends_with(".bin") {
            continue;
        }
        if dry_run {
            info!(path = %path.display(), "would remove");
            removed += 1;
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "removed stale region");
                removed += 1;
            }
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove"),
        }
    }

    if removed == 0 {
        info!("no stale regions found");
    } else {
        info!(removed, dry_run, "cleanup complete");
    }
    Ok(())
}
