// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! # Framelock — frame-synchronized multi-process coordination
//!
//! Framelock lets a set of cooperating processes share a live image stream
//! and react to it on exact logical frames: one process captures, others
//! analyze, and schedulers fire planned device actions when the observed
//! frame counter says so. All exchange happens through named shared-memory
//! regions; there is no broker and no socket.
//!
//! This crate is the umbrella: it re-exports every workspace member. The
//! members are also usable individually:
//!
//! - [`ipc`] — shared regions, slot buffers, broadcast channels, stop flag
//! - [`scheduler`] — action plans, the commander, the lifecycle manager
//! - [`config`] — `framelock.toml` loading and validation
//! - [`runtime`] — capture/analysis loops, engine seams, mocks
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use framelock::prelude::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = FramelockConfig::default();
//! let names = SessionNames::new(&config.session.name_prefix);
//! let dir = config.session.region_dir.as_path();
//!
//! // Producer side: create the session's image buffer.
//! let mut images = SlotBuffer::create(
//!     dir,
//!     &names.image(),
//!     config.ipc.image_slots,
//!     config.capture.frame_bytes(),
//! )?;
//! let stop = StopFlag::create(dir, &names.stop())?;
//!
//! let shape = FrameShape { width: 1920, height: 1080, channels: 4 };
//! let mut engine = MockCaptureEngine::new(shape, Duration::from_millis(16));
//! run_capture(&mut engine, &mut images, &stop)?;
//! # Ok(())
//! # }
//! ```

pub use framelock_config as config;
pub use framelock_ipc as ipc;
pub use framelock_runtime as runtime;
pub use framelock_scheduler as scheduler;

pub mod logging;

/// The most commonly used types, importable in one line.
pub mod prelude {
    pub use framelock_config::{load_config, FramelockConfig};
    pub use framelock_ipc::{
        BroadcastChannel, FrameIndex, FrameRecord, GameState, IpcError, SlotBuffer, StateBuffer,
        StopFlag, Subscriber,
    };
    pub use framelock_runtime::{
        run_analysis, run_capture, run_state_detection, CaptureEngine, FrameAnalyzer, FrameShape,
        MockCaptureEngine, SessionNames, StateDetector,
    };
    pub use framelock_scheduler::{
        Action, ActionPlan, CommandDriver, FrameScheduler, RunOutcome, SchedulerConfig,
        SkipPolicy, StateScheduler, StateTrigger,
    };
}

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
