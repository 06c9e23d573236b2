// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! Canonical shared-region names for one session.
//!
//! Every process in a session derives the same names from the same prefix,
//! so attachment needs nothing but the config. Distinct prefixes isolate
//! concurrent sessions on one host.

/// Region names for the five shared resources of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionNames {
    prefix: String,
}

impl SessionNames {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Rotating image slot buffer (capture producer, analysis consumers).
    pub fn image(&self) -> String {
        format!("{}_image", self.prefix)
    }

    /// Latest analyzed frame record.
    pub fn frame_record(&self) -> String {
        format!("{}_frame_state", self.prefix)
    }

    /// Broadcast channel carrying the logical frame counter.
    pub fn frame_channel(&self) -> String {
        format!("{}_frame_chan", self.prefix)
    }

    /// Broadcast channel carrying the wire-form game state.
    pub fn state_channel(&self) -> String {
        format!("{}_game_chan", self.prefix)
    }

    /// Session-wide stop flag.
    pub fn stop(&self) -> String {
        format!("{}_stop", self.prefix)
    }
}
