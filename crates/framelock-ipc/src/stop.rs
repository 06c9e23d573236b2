// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! Cross-process cancellation flag.
//!
//! The orchestrator creates one flag per session; every process loop polls
//! it once per iteration and, on observing it set, stops producing or
//! consuming and detaches from its shared-memory handles before exiting.

use std::path::Path;
use std::sync::atomic::Ordering;

use crate::error::IpcError;
use crate::region::SharedRegion;

/// "FLCKSTOP"
pub const STOP_MAGIC: u64 = 0x464C_434B_5354_4F50;
const REGION_LEN: usize = 16;
const FLAG_OFFSET: usize = 8;

/// Latched one-way stop signal in a tiny shared region.
pub struct StopFlag {
    region: SharedRegion,
}

impl StopFlag {
    pub fn create(dir: &Path, name: &str) -> Result<Self, IpcError> {
        let mut region = SharedRegion::create(dir, name, REGION_LEN)?;
        region.bytes_mut()[0..8].copy_from_slice(&STOP_MAGIC.to_le_bytes());
        Ok(Self { region })
    }

    pub fn open(dir: &Path, name: &str) -> Result<Self, IpcError> {
        let region = SharedRegion::open(dir, name)?;
        if region.len() < REGION_LEN {
            return Err(IpcError::Truncated {
                expected: REGION_LEN,
                actual: region.len(),
            });
        }
        let mut magic = [0u8; 8];
        magic.copy_from_slice(&region.bytes()[0..8]);
        let magic = u64::from_le_bytes(magic);
        if magic != STOP_MAGIC {
            return Err(IpcError::BadMagic {
                found: magic,
                expected: STOP_MAGIC,
            });
        }
        Ok(Self { region })
    }

    fn flag(&self) -> &std::sync::atomic::AtomicU64 {
        unsafe { self.region.atomic_u64(FLAG_OFFSET) }
    }

    /// Latch the stop signal. Idempotent; visible to every attached
    /// process immediately.
    pub fn trigger(&self) {
        self.flag().store(1, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.flag().load(Ordering::Acquire) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_is_visible_across_attachments() {
        let dir = tempfile::tempdir().unwrap();
        let owner = StopFlag::create(dir.path(), "stop").unwrap();
        let attached = StopFlag::open(dir.path(), "stop").unwrap();

        assert!(!owner.is_set());
        assert!(!attached.is_set());

        attached.trigger();
        assert!(owner.is_set());

        // Idempotent.
        owner.trigger();
        assert!(attached.is_set());
    }

    #[test]
    fn open_rejects_foreign_region() {
        let dir = tempfile::tempdir().unwrap();
        let _junk = SharedRegion::create(dir.path(), "not_a_stop", 16).unwrap();
        assert!(matches!(
            StopFlag::open(dir.path(), "not_a_stop"),
            Err(IpcError::BadMagic { .. })
        ));
    }
}
