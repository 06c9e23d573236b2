// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! Tracing initialization shared by the session binaries.
//!
//! Console output only; processes in a session are expected to run under a
//! supervisor that captures stderr. The filter comes from (highest wins)
//! `RUST_LOG`, the `logging.filter` config value, then `"info"`.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Safe to call more than once: a second initialization (tests, embedded
/// use behind another subscriber) is ignored.
pub fn init(config_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
