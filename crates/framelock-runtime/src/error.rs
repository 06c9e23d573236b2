// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! Error types for engine implementations and the runtime loops.

use framelock_ipc::IpcError;
use thiserror::Error;

/// Failure inside a capture engine, frame analyzer, or state detector.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Device-level failure reported by the backend (lost display stream,
    /// driver reset, protocol error). The loop treats this as fatal.
    #[error("device error: {0}")]
    Device(String),
}

/// Failure of one runtime loop. Each loop owns its process attachments, so
/// a `RuntimeError` means the whole loop is done, not one iteration.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Ipc(#[from] IpcError),

    #[error("engine failed: {0}")]
    Engine(#[from] EngineError),

    /// The engine's frame shape does not match the slot size of the image
    /// buffer it must publish into. Checked once at loop start.
    #[error("frame shape mismatch: engine produces {engine} bytes, slot holds {slot}")]
    ShapeMismatch { engine: usize, slot: usize },
}
