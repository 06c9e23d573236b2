// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! Shared value types carried through the exchange primitives.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Logical frame counter derived from visual game state, not wall clock.
/// Non-decreasing over a run except at an explicit session reset.
pub type FrameIndex = u64;

/// Fixed-layout analysis result published through a
/// [`StateBuffer`](crate::slot::StateBuffer).
///
/// `total_frames` is -1 until the analyzer produces its first reading.
/// 24 bytes, no padding; the layout is part of the IPC contract.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct FrameRecord {
    /// Logical frames elapsed since session start (-1 = no reading yet).
    pub total_frames: i64,
    /// Frame position within the current fill cycle.
    pub logical_frame: i32,
    /// Number of completed fill cycles.
    pub cycle_index: i32,
    /// Producer timestamp, microseconds since the Unix epoch.
    pub timestamp_us: u64,
}

impl FrameRecord {
    /// Record published before the first analysis result exists.
    pub fn unset() -> Self {
        Self {
            total_frames: -1,
            logical_frame: -1,
            cycle_index: -1,
            timestamp_us: 0,
        }
    }

    pub fn has_reading(&self) -> bool {
        self.total_frames >= 0
    }
}

/// Detected game lifecycle state. Not monotonic, unlike [`FrameIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    Running,
    Paused,
    Won,
    Lost,
    Unknown,
}

impl GameState {
    /// Wire form used on the state broadcast channel.
    pub fn to_wire(self) -> u32 {
        match self {
            GameState::Running => 0,
            GameState::Paused => 1,
            GameState::Won => 2,
            GameState::Lost => 3,
            GameState::Unknown => 4,
        }
    }

    /// Decode the wire form; anything unrecognized collapses to `Unknown`.
    pub fn from_wire(raw: u32) -> Self {
        match raw {
            0 => GameState::Running,
            1 => GameState::Paused,
            2 => GameState::Won,
            3 => GameState::Lost,
            _ => GameState::Unknown,
        }
    }
}
