// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! Scheduler-side error types.

use framelock_ipc::IpcError;

/// Plan loading and validation failures. Always fatal at startup; a plan
/// that fails here never reaches the scheduler loop.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("failed to read plan file: {0}")]
    Io(#[from] std::io::Error),

    #[error("plan is not valid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error(
        "trigger frames must be non-decreasing: entry {index} targets frame {frame} \
         after frame {previous}"
    )]
    NonMonotonic {
        index: usize,
        frame: u64,
        previous: u64,
    },
}

/// Failure reported by a command driver. The scheduler never retries a
/// failed action; retrying a physical input risks duplicate effects.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("driver I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("command rejected: {0}")]
    Rejected(String),

    #[error("device unavailable: {0}")]
    Unavailable(String),
}

/// Errors that terminate a scheduler run.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("channel stalled: {timeouts} consecutive wait timeouts, upstream is likely down")]
    ChannelStalled { timeouts: u32 },

    #[error("driver failed executing action {index}: {source}")]
    Driver {
        index: usize,
        #[source]
        source: DriverError,
    },

    #[error(transparent)]
    Ipc(#[from] IpcError),
}
