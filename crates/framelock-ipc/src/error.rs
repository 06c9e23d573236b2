// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! Error types for shared-memory primitives.

use std::path::PathBuf;

/// Errors raised by region creation, attachment and access.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("shared memory I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid region name '{0}': must be a bare file stem")]
    BadName(String),

    #[error("bad magic in region header (found {found:#018x}, expected {expected:#018x})")]
    BadMagic { found: u64, expected: u64 },

    #[error("unsupported region layout version {found} (this build speaks {expected})")]
    Version { found: u32, expected: u32 },

    #[error("invalid slot geometry: {0}")]
    Geometry(String),

    #[error("region is {actual} bytes but its header describes {expected}")]
    Truncated { expected: usize, actual: usize },

    #[error("caller buffer is {actual} bytes, slot payload is {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("slot overwritten during read, retry budget of {retries} exhausted")]
    TornRead { retries: u32 },
}

impl IpcError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IpcError::Io {
            path: path.into(),
            source,
        }
    }

    /// Transient conditions are absorbed by callers (skip the tick);
    /// everything else is structural and should propagate.
    pub fn is_transient(&self) -> bool {
        matches!(self, IpcError::TornRead { .. })
    }
}
