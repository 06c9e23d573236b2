// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! Seam between the schedulers and the device input layer.

use crate::error::DriverError;
use crate::plan::Action;

/// Executes one abstract action against the controlled device.
///
/// Contract: the scheduler calls `execute` at most once per planned
/// invocation and never retries a failure (the physical input may have
/// partially happened). Implementations must complete or fail within a
/// bounded time so the scheduler loop cannot stall indefinitely.
pub trait CommandDriver {
    fn execute(&mut self, action: &Action) -> Result<(), DriverError>;
}
