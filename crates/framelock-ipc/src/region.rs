// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! Named shared-memory regions backed by memory-mapped files.
//!
//! One process creates a region (the owner), every other process opens it
//! by directory + name. The owner unlinks the backing file when dropped;
//! existing mappings in other processes remain valid until they unmap, so
//! destroy-after-detach falls out of POSIX unlink semantics.
//!
//! The default region directory is `/dev/shm` so the backing file never
//! touches a real disk.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicU64;

use memmap2::MmapMut;
use tracing::debug;

use crate::error::IpcError;

/// A memory-mapped shared region with create/open roles.
pub struct SharedRegion {
    path: PathBuf,
    _file: File,
    mmap: MmapMut,
    owner: bool,
}

fn region_path(dir: &Path, name: &str) -> Result<PathBuf, IpcError> {
    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return Err(IpcError::BadName(name.to_string()));
    }
    Ok(dir.join(format!("{name}.bin")))
}

impl SharedRegion {
    /// Create a new region of `len` bytes, zero-filled. Fails if a region
    /// of the same name already exists (stale regions from a crashed run
    /// must be removed first, see the `framelock-shm-clean` tool).
    pub fn create(dir: &Path, name: &str, len: usize) -> Result<Self, IpcError> {
        let path = region_path(dir, name)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| IpcError::io(&path, e))?;
        file.set_len(len as u64).map_err(|e| IpcError::io(&path, e))?;
        let mmap = unsafe { MmapMut::map_mut(&file) }.map_err(|e| IpcError::io(&path, e))?;
        debug!(path = %path.display(), len, "created shared region");
        Ok(Self {
            path,
            _file: file,
            mmap,
            owner: true,
        })
    }

    /// Attach to an existing region created by another process.
    pub fn open(dir: &Path, name: &str) -> Result<Self, IpcError> {
        let path = region_path(dir, name)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| IpcError::io(&path, e))?;
        let mmap = unsafe { MmapMut::map_mut(&file) }.map_err(|e| IpcError::io(&path, e))?;
        debug!(path = %path.display(), len = mmap.len(), "attached to shared region");
        Ok(Self {
            path,
            _file: file,
            mmap,
            owner: false,
        })
    }

    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.len() == 0
    }

    pub fn is_owner(&self) -> bool {
        self.owner
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.mmap
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.mmap
    }

    /// View an 8-byte word of the region as an atomic.
    ///
    /// # Safety
    /// `offset` must be in bounds, 8-byte aligned, and every process
    /// touching that word must do so through an atomic of the same width.
    pub(crate) unsafe fn atomic_u64(&self, offset: usize) -> &AtomicU64 {
        debug_assert!(offset + 8 <= self.mmap.len());
        debug_assert_eq!((self.mmap.as_ptr() as usize + offset) % 8, 0);
        &*(self.mmap.as_ptr().add(offset) as *const AtomicU64)
    }
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        if self.owner {
            // Attached processes keep their mappings; only the name goes away.
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to unlink shared region");
            } else {
                debug!(path = %self.path.display(), "unlinked shared region");
            }
        }
    }
}
