// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! # framelock-scheduler
//!
//! Frame-synchronized action scheduling.
//!
//! - [`ActionPlan`] — ordered, immutable list of timed actions, fully
//!   validated at load time.
//! - [`FrameScheduler`] (the commander) — consumes the logical-frame
//!   broadcast channel and fires each planned action exactly once at its
//!   trigger frame, tolerating skipped and duplicated frame notifications.
//! - [`StateScheduler`] (the lifecycle manager) — same reaction loop keyed
//!   on game-state transitions instead of frame ordering.
//! - [`CommandDriver`] — the seam to the device input layer.

pub mod commander;
pub mod driver;
pub mod error;
pub mod lifecycle;
pub mod plan;

pub use commander::{FrameScheduler, Phase, RunOutcome, SchedulerConfig, SkipPolicy};
pub use driver::CommandDriver;
pub use error::{DriverError, PlanError, SchedulerError};
pub use lifecycle::{StateScheduler, StateTrigger};
pub use plan::{Action, ActionPlan, PlannedAction};

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
