// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! # framelock-ipc
//!
//! Process-shared exchange primitives for frame-synchronized pipelines.
//!
//! Everything here is a thin wrapper over a memory-mapped region with a
//! fixed-offset coordination header:
//!
//! - [`SlotBuffer`] — single-producer, multi-consumer rotating slots that
//!   always expose the most recently completed payload (freshness over
//!   completeness; slow consumers silently miss intermediate frames).
//! - [`StateBuffer`] — typed two-slot buffer for one fixed-size record.
//! - [`BroadcastChannel`] / [`Subscriber`] — shared scalar plus a
//!   bounded-interval wake for cross-process event delivery.
//! - [`StopFlag`] — cross-process cancellation.
//!
//! Regions are created by exactly one owner process and opened by reference
//! (directory + name) by every other participant. The owner unlinks the
//! backing file on drop; attached mappings stay valid until the last
//! participant unmaps.
//!
//! SHM regions are Unix-only, like every memmap-backed transport this
//! project runs on.

pub mod channel;
pub mod error;
pub mod region;
pub mod slot;
pub mod stop;
pub mod types;

pub use channel::{BroadcastChannel, Subscriber};
pub use error::IpcError;
pub use region::SharedRegion;
pub use slot::{SlotBuffer, StateBuffer, WritableSlot};
pub use stop::StopFlag;
pub use types::{FrameIndex, FrameRecord, GameState};

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
