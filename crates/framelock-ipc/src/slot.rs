// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! Single-producer, multi-consumer slot buffers over shared memory.
//!
//! Region layout:
//!
//! ```text
//! Header (64 bytes):
//!   [0:8]   Magic number (0x464C434B534C4F54 = "FLCKSLOT")
//!   [8:12]  Layout version (u32)
//!   [12:16] Slot count (u32)
//!   [16:24] Slot size in bytes (u64)
//!   [24:32] Ready word (AtomicU64): generation << 8 | ready slot index
//!   [32:64] Reserved
//! Slots:
//!   [64 + i * slot_size .. 64 + (i + 1) * slot_size]
//! ```
//!
//! The ready word is the only coordination state shared between roles, and
//! it carries the slot index and the generation counter in a single atomic
//! word so the pair can never be observed torn. The producer writes payload
//! bytes only into non-ready slots, so payload memory needs no lock.
//!
//! There is no queue: only the latest completed slot is reachable. A
//! consumer slower than the producer misses intermediate frames, which is
//! the intended trade (freshness over completeness).

use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::atomic::{fence, Ordering};

use bytemuck::{Pod, Zeroable};
use tracing::trace;

use crate::error::IpcError;
use crate::region::SharedRegion;

/// "FLCKSLOT"
pub const SLOT_MAGIC: u64 = 0x464C_434B_534C_4F54;
const LAYOUT_VERSION: u32 = 1;
const HEADER_SIZE: usize = 64;

const MAGIC_OFFSET: usize = 0;
const VERSION_OFFSET: usize = 8;
const SLOT_COUNT_OFFSET: usize = 12;
const SLOT_SIZE_OFFSET: usize = 16;
const READY_OFFSET: usize = 24;

/// Default bound on generation-change retries in [`SlotBuffer::read_latest`].
pub const DEFAULT_READ_RETRY_BUDGET: u32 = 3;

const INDEX_BITS: u64 = 0xFF;

fn pack_ready(index: u32, generation: u64) -> u64 {
    (generation << 8) | (index as u64 & INDEX_BITS)
}

fn ready_index(word: u64) -> u32 {
    (word & INDEX_BITS) as u32
}

fn ready_generation(word: u64) -> u64 {
    word >> 8
}

/// Fixed-capacity rotating slot buffer in a named shared region.
///
/// Exactly one process per buffer may act as the producer
/// ([`acquire_write_slot`](Self::acquire_write_slot) / publish); any number
/// may read. None of the operations block.
pub struct SlotBuffer {
    region: SharedRegion,
    slot_count: u32,
    slot_size: usize,
    write_index: u32,
    read_retry_budget: u32,
}

impl SlotBuffer {
    /// Create a buffer with `slot_count >= 2` slots of `slot_size` bytes.
    ///
    /// The ready word initially points at the last slot (zero-filled), so
    /// the first write targets slot 0 and early readers see a blank frame
    /// rather than racing the producer.
    pub fn create(
        dir: &Path,
        name: &str,
        slot_count: u32,
        slot_size: usize,
    ) -> Result<Self, IpcError> {
        if slot_count < 2 {
            return Err(IpcError::Geometry(format!(
                "slot_count must be >= 2, got {slot_count}"
            )));
        }
        if slot_count as u64 > INDEX_BITS {
            return Err(IpcError::Geometry(format!(
                "slot_count must fit the 8-bit ready index, got {slot_count}"
            )));
        }
        if slot_size == 0 {
            return Err(IpcError::Geometry("slot_size must be non-zero".into()));
        }

        let len = HEADER_SIZE + slot_count as usize * slot_size;
        let mut region = SharedRegion::create(dir, name, len)?;

        let header = region.bytes_mut();
        header[MAGIC_OFFSET..MAGIC_OFFSET + 8].copy_from_slice(&SLOT_MAGIC.to_le_bytes());
        header[VERSION_OFFSET..VERSION_OFFSET + 4].copy_from_slice(&LAYOUT_VERSION.to_le_bytes());
        header[SLOT_COUNT_OFFSET..SLOT_COUNT_OFFSET + 4]
            .copy_from_slice(&slot_count.to_le_bytes());
        header[SLOT_SIZE_OFFSET..SLOT_SIZE_OFFSET + 8]
            .copy_from_slice(&(slot_size as u64).to_le_bytes());
        header[READY_OFFSET..READY_OFFSET + 8]
            .copy_from_slice(&pack_ready(slot_count - 1, 0).to_le_bytes());

        Ok(Self {
            region,
            slot_count,
            slot_size,
            write_index: 0,
            read_retry_budget: DEFAULT_READ_RETRY_BUDGET,
        })
    }

    /// Attach to a buffer created by another process, deriving the geometry
    /// from the region header. A shape mismatch surfaces here, at startup.
    pub fn open(dir: &Path, name: &str) -> Result<Self, IpcError> {
        let region = SharedRegion::open(dir, name)?;
        if region.len() < HEADER_SIZE {
            return Err(IpcError::Truncated {
                expected: HEADER_SIZE,
                actual: region.len(),
            });
        }

        let bytes = region.bytes();
        let u64_at = |off: usize| {
            let mut b = [0u8; 8];
            b.copy_from_slice(&bytes[off..off + 8]);
            u64::from_le_bytes(b)
        };
        let magic = u64_at(MAGIC_OFFSET);
        if magic != SLOT_MAGIC {
            return Err(IpcError::BadMagic {
                found: magic,
                expected: SLOT_MAGIC,
            });
        }
        let u32_at = |off: usize| {
            let mut b = [0u8; 4];
            b.copy_from_slice(&bytes[off..off + 4]);
            u32::from_le_bytes(b)
        };
        let version = u32_at(VERSION_OFFSET);
        if version != LAYOUT_VERSION {
            return Err(IpcError::Version {
                found: version,
                expected: LAYOUT_VERSION,
            });
        }
        let slot_count = u32_at(SLOT_COUNT_OFFSET);
        let slot_size = u64_at(SLOT_SIZE_OFFSET) as usize;
        if slot_count < 2 || slot_size == 0 {
            return Err(IpcError::Geometry(format!(
                "header describes {slot_count} slots of {slot_size} bytes"
            )));
        }
        let expected = HEADER_SIZE + slot_count as usize * slot_size;
        if region.len() < expected {
            return Err(IpcError::Truncated {
                expected,
                actual: region.len(),
            });
        }

        Ok(Self {
            region,
            slot_count,
            slot_size,
            write_index: 0,
            read_retry_budget: DEFAULT_READ_RETRY_BUDGET,
        })
    }

    pub fn slot_count(&self) -> u32 {
        self.slot_count
    }

    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    pub fn is_owner(&self) -> bool {
        self.region.is_owner()
    }

    /// Bound on generation-change retries before `read_latest` gives up
    /// with a transient [`IpcError::TornRead`].
    pub fn set_read_retry_budget(&mut self, retries: u32) {
        self.read_retry_budget = retries;
    }

    fn ready_word(&self) -> &std::sync::atomic::AtomicU64 {
        // Header offset is fixed and 8-aligned; the word is only ever
        // accessed through this atomic view in every process.
        unsafe { self.region.atomic_u64(READY_OFFSET) }
    }

    fn slot_range(&self, index: u32) -> std::ops::Range<usize> {
        let start = HEADER_SIZE + index as usize * self.slot_size;
        start..start + self.slot_size
    }

    fn slot_bytes(&self, index: u32) -> &[u8] {
        &self.region.bytes()[self.slot_range(index)]
    }

    fn slot_bytes_mut(&mut self, index: u32) -> &mut [u8] {
        let range = self.slot_range(index);
        &mut self.region.bytes_mut()[range]
    }

    /// Generation of the currently published slot. Starts at 0 (nothing
    /// published yet) and increases by 1 per publish. Cheap freshness probe
    /// for consumers that want to skip unchanged payloads.
    pub fn generation(&self) -> u64 {
        ready_generation(self.ready_word().load(Ordering::Acquire))
    }

    /// [producer] Borrow a slot that is guaranteed not to be the currently
    /// ready one. Never blocks and never fails: with `slot_count >= 2`
    /// there is always a non-ready slot to hand out.
    pub fn acquire_write_slot(&mut self) -> WritableSlot<'_> {
        let ready = ready_index(self.ready_word().load(Ordering::Acquire));
        let mut index = self.write_index % self.slot_count;
        if index == ready {
            index = (index + 1) % self.slot_count;
        }
        trace!(index, ready, "acquired write slot");
        WritableSlot { buffer: self, index }
    }

    /// Single atomic store of the (index, generation) pair.
    fn publish_index(&mut self, index: u32) {
        let generation = ready_generation(self.ready_word().load(Ordering::Relaxed));
        self.ready_word()
            .store(pack_ready(index, generation + 1), Ordering::Release);
        // Rotating forward keeps N=3 off the slot a laggy reader is most
        // likely still holding; N=2 degenerates to plain alternation.
        self.write_index = (index + 1) % self.slot_count;
    }

    /// [consumer] Copy the most recently published payload into `out`.
    ///
    /// Re-reads the ready word after the copy; if the buffer was
    /// republished mid-copy the copy is retried, bounded by the retry
    /// budget. Returns the generation the payload belongs to. Never blocks.
    pub fn read_latest(&self, out: &mut [u8]) -> Result<u64, IpcError> {
        if out.len() != self.slot_size {
            return Err(IpcError::SizeMismatch {
                expected: self.slot_size,
                actual: out.len(),
            });
        }
        for _ in 0..=self.read_retry_budget {
            let before = self.ready_word().load(Ordering::Acquire);
            out.copy_from_slice(self.slot_bytes(ready_index(before)));
            // Order the copy before the validating re-read.
            fence(Ordering::Acquire);
            let after = self.ready_word().load(Ordering::Acquire);
            if before == after {
                return Ok(ready_generation(before));
            }
            trace!(
                before = ready_generation(before),
                after = ready_generation(after),
                "slot republished during read, retrying"
            );
        }
        Err(IpcError::TornRead {
            retries: self.read_retry_budget,
        })
    }
}

/// Borrowed write access to one non-ready slot.
///
/// Deref target is the raw payload; call [`publish`](Self::publish) to make
/// the slot visible to consumers. Dropping without publishing discards the
/// write. Must not be held across producer iterations.
pub struct WritableSlot<'a> {
    buffer: &'a mut SlotBuffer,
    index: u32,
}

impl WritableSlot<'_> {
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Atomically make this slot the ready one and bump the generation.
    pub fn publish(self) {
        self.buffer.publish_index(self.index);
    }
}

impl Deref for WritableSlot<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buffer.slot_bytes(self.index)
    }
}

impl DerefMut for WritableSlot<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buffer.slot_bytes_mut(self.index)
    }
}

/// Typed two-slot buffer holding one fixed-size `Pod` record.
///
/// The shared-memory equivalent of a `watch` cell: the producer overwrites,
/// consumers snapshot the latest value. Used for the analysis-side
/// [`FrameRecord`](crate::types::FrameRecord) stream.
pub struct StateBuffer<T: Pod> {
    inner: SlotBuffer,
    _marker: PhantomData<T>,
}

impl<T: Pod> StateBuffer<T> {
    pub fn create(dir: &Path, name: &str) -> Result<Self, IpcError> {
        let inner = SlotBuffer::create(dir, name, 2, std::mem::size_of::<T>())?;
        Ok(Self {
            inner,
            _marker: PhantomData,
        })
    }

    pub fn open(dir: &Path, name: &str) -> Result<Self, IpcError> {
        let inner = SlotBuffer::open(dir, name)?;
        if inner.slot_size() != std::mem::size_of::<T>() {
            return Err(IpcError::SizeMismatch {
                expected: std::mem::size_of::<T>(),
                actual: inner.slot_size(),
            });
        }
        Ok(Self {
            inner,
            _marker: PhantomData,
        })
    }

    /// [producer] Publish a new value.
    pub fn set(&mut self, value: &T) -> Result<(), IpcError> {
        let mut slot = self.inner.acquire_write_slot();
        slot.copy_from_slice(bytemuck::bytes_of(value));
        slot.publish();
        Ok(())
    }

    /// [consumer] Snapshot the latest value and its generation.
    /// Generation 0 means nothing has been published yet (zeroed record).
    pub fn get(&self) -> Result<(T, u64), IpcError> {
        let mut value = T::zeroed();
        let generation = self.inner.read_latest(bytemuck::bytes_of_mut(&mut value))?;
        Ok((value, generation))
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation()
    }
}
