// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! Configuration schema. Every field has a default so a partial (or
//! absent) file yields a usable configuration.

use std::path::PathBuf;
use std::time::Duration;

use framelock_scheduler::{SchedulerConfig, SkipPolicy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FramelockConfig {
    pub session: SessionConfig,
    pub capture: CaptureConfig,
    pub ipc: IpcConfig,
    pub scheduler: SchedulerSection,
    pub logging: LoggingConfig,
}

/// Identity of one run's shared resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Prefix for every shared region name created by this session.
    pub name_prefix: String,
    /// Directory holding the region backing files.
    pub region_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name_prefix: "framelock".into(),
            region_dir: PathBuf::from("/dev/shm"),
        }
    }
}

/// Fixed image shape for the capture buffer. A shape change requires
/// destroying and recreating the buffer, so it lives in config, not code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            channels: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IpcConfig {
    /// Slot count for the image buffer (3 = triple buffering; 2 is legal
    /// with reduced tolerance for consumer lag).
    pub image_slots: u32,
    /// Generation-probe interval while blocked in a channel wait.
    pub poll_interval_us: u64,
    /// Retries before a slot read surfaces a transient torn-read.
    pub read_retry_budget: u32,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            image_slots: 3,
            poll_interval_us: 500,
            read_retry_budget: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerSection {
    pub wait_timeout_ms: u64,
    pub max_consecutive_timeouts: u32,
    pub skip_warn_tolerance: u64,
    pub skip_policy: SkipPolicy,
    pub continue_on_error: bool,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        let defaults = SchedulerConfig::default();
        Self {
            wait_timeout_ms: defaults.wait_timeout.as_millis() as u64,
            max_consecutive_timeouts: defaults.max_consecutive_timeouts,
            skip_warn_tolerance: defaults.skip_warn_tolerance,
            skip_policy: defaults.skip_policy,
            continue_on_error: defaults.continue_on_error,
        }
    }
}

impl SchedulerSection {
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            wait_timeout: Duration::from_millis(self.wait_timeout_ms),
            max_consecutive_timeouts: self.max_consecutive_timeouts,
            skip_warn_tolerance: self.skip_warn_tolerance,
            skip_policy: self.skip_policy,
            continue_on_error: self.continue_on_error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// tracing env-filter directive, e.g. "info" or "framelock_ipc=debug,info".
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
        }
    }
}

impl IpcConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_us)
    }
}

impl CaptureConfig {
    /// Bytes in one full frame of the configured shape.
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consistent_with_scheduler_defaults() {
        let section = SchedulerSection::default();
        let config = section.scheduler_config();
        let reference = SchedulerConfig::default();
        assert_eq!(config.wait_timeout, reference.wait_timeout);
        assert_eq!(config.max_consecutive_timeouts, reference.max_consecutive_timeouts);
        assert_eq!(config.skip_policy, reference.skip_policy);
    }

    #[test]
    fn frame_bytes_matches_shape() {
        let capture = CaptureConfig {
            width: 320,
            height: 180,
            channels: 4,
        };
        assert_eq!(capture.frame_bytes(), 320 * 180 * 4);
    }
}
