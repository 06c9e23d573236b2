// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! Deterministic mock engines and a recording driver.
//!
//! The mock capture engine embeds a 24-bit frame counter in the first
//! pixel, the mock analyzer and detector decode it, and the mock driver
//! records what the schedulers asked for. Together they exercise the full
//! pipeline with no display, no game, and no input device.

use std::sync::Arc;
use std::time::{Duration, Instant};

use framelock_ipc::{FrameRecord, GameState};
use framelock_scheduler::{Action, CommandDriver, DriverError};
use parking_lot::Mutex;

use crate::engines::{CaptureEngine, FrameAnalyzer, FrameShape, StateDetector};
use crate::error::EngineError;

/// Frames per fill cycle in mock frame records.
pub const MOCK_FRAMES_PER_CYCLE: i64 = 60;

const COUNTER_MASK: u32 = 0x00FF_FFFF;

fn encode_counter(frame: &mut [u8], counter: u32) {
    frame[0] = (counter & 0xFF) as u8;
    frame[1] = ((counter >> 8) & 0xFF) as u8;
    frame[2] = ((counter >> 16) & 0xFF) as u8;
}

fn decode_counter(frame: &[u8]) -> Option<u32> {
    if frame.len() < 3 {
        return None;
    }
    Some(u32::from(frame[0]) | u32::from(frame[1]) << 8 | u32::from(frame[2]) << 16)
}

/// Synthetic capture source: each frame carries a monotonically increasing
/// 24-bit counter in the bytes of its first pixel, paced at a fixed
/// interval so downstream timing behaves like a real display stream.
pub struct MockCaptureEngine {
    shape: FrameShape,
    frame_interval: Duration,
    counter: u32,
    next_deadline: Option<Instant>,
    running: bool,
}

impl MockCaptureEngine {
    pub fn new(shape: FrameShape, frame_interval: Duration) -> Self {
        Self {
            shape,
            frame_interval,
            counter: 0,
            next_deadline: None,
            running: false,
        }
    }

    /// Counter the next captured frame will carry.
    pub fn counter(&self) -> u32 {
        self.counter
    }
}

impl CaptureEngine for MockCaptureEngine {
    fn start(&mut self) -> Result<(), EngineError> {
        if self.shape.channels < 3 {
            return Err(EngineError::Device(format!(
                "counter encoding needs >= 3 channels, shape has {}",
                self.shape.channels
            )));
        }
        self.running = true;
        self.next_deadline = Some(Instant::now());
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        self.running = false;
        self.next_deadline = None;
        Ok(())
    }

    fn frame_shape(&self) -> FrameShape {
        self.shape
    }

    fn capture_into(&mut self, frame: &mut [u8]) -> Result<(), EngineError> {
        if !self.running {
            return Err(EngineError::Device("engine not started".into()));
        }
        if let Some(deadline) = self.next_deadline {
            let now = Instant::now();
            if deadline > now {
                std::thread::sleep(deadline - now);
            }
            self.next_deadline = Some(deadline + self.frame_interval);
        }
        frame.fill(0);
        encode_counter(frame, self.counter);
        self.counter = (self.counter + 1) & COUNTER_MASK;
        Ok(())
    }
}

/// Decodes the mock counter into a frame record.
pub struct CounterAnalyzer {
    frames_per_cycle: i64,
}

impl CounterAnalyzer {
    pub fn new() -> Self {
        Self {
            frames_per_cycle: MOCK_FRAMES_PER_CYCLE,
        }
    }
}

impl Default for CounterAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAnalyzer for CounterAnalyzer {
    fn analyze(&mut self, frame: &[u8]) -> Result<Option<FrameRecord>, EngineError> {
        let Some(counter) = decode_counter(frame) else {
            return Ok(None);
        };
        let total = counter as i64;
        Ok(Some(FrameRecord {
            total_frames: total,
            logical_frame: (total % self.frames_per_cycle) as i32,
            cycle_index: (total / self.frames_per_cycle) as i32,
            timestamp_us: now_micros(),
        }))
    }
}

fn now_micros() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Declares the game lost once the mock counter reaches a threshold.
pub struct ThresholdStateDetector {
    lost_at: u32,
}

impl ThresholdStateDetector {
    pub fn new(lost_at: u32) -> Self {
        Self { lost_at }
    }
}

impl StateDetector for ThresholdStateDetector {
    fn detect(&mut self, frame: &[u8]) -> Result<Option<GameState>, EngineError> {
        let Some(counter) = decode_counter(frame) else {
            return Ok(None);
        };
        Ok(Some(if counter >= self.lost_at {
            GameState::Lost
        } else {
            GameState::Running
        }))
    }
}

/// Driver that records every executed action. The log handle is shared so
/// a test can inspect it while a scheduler owns the driver.
pub struct MockDriver {
    log: Arc<Mutex<Vec<Action>>>,
    fail: bool,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    /// Every `execute` call will be rejected.
    pub fn failing() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        }
    }

    pub fn log_handle(&self) -> Arc<Mutex<Vec<Action>>> {
        self.log.clone()
    }

    pub fn executed(&self) -> Vec<Action> {
        self.log.lock().clone()
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandDriver for MockDriver {
    fn execute(&mut self, action: &Action) -> Result<(), DriverError> {
        if self.fail {
            return Err(DriverError::Rejected("mock driver set to fail".into()));
        }
        self.log.lock().push(action.clone());
        Ok(())
    }
}
