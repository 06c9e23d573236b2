// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! Collaborator traits the runtime loops are generic over.
//!
//! A capture backend fills raw frames; analyzers and detectors turn a raw
//! frame into a scalar reading or a lifecycle label. The loops own the
//! timing and the shared-memory plumbing; implementations own only the
//! pixels.

use crate::error::EngineError;
use framelock_ipc::{FrameRecord, GameState};

/// Pixel geometry of the frames a capture engine produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameShape {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl FrameShape {
    /// Bytes in one frame of this shape.
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize
    }
}

/// Source of raw frames (a display stream, a video device, or a mock).
///
/// `capture_into` must fill the entire buffer; the capture loop sizes it to
/// exactly `frame_shape().byte_len()` bytes and calls it once per frame.
/// `start` is called once before the first capture, `stop` once after the
/// last, even when the loop exits on an error.
pub trait CaptureEngine {
    fn start(&mut self) -> Result<(), EngineError>;
    fn stop(&mut self) -> Result<(), EngineError>;
    fn frame_shape(&self) -> FrameShape;
    fn capture_into(&mut self, frame: &mut [u8]) -> Result<(), EngineError>;
}

/// Extracts a frame reading from one raw frame.
///
/// `Ok(None)` means "no reading in this frame" (occluded counter, scene
/// transition); the analysis loop publishes nothing and moves on.
pub trait FrameAnalyzer {
    fn analyze(&mut self, frame: &[u8]) -> Result<Option<FrameRecord>, EngineError>;
}

/// Classifies one raw frame into a lifecycle state.
///
/// `Ok(None)` means the detector could not classify this frame; the
/// previous broadcast state stands.
pub trait StateDetector {
    fn detect(&mut self, frame: &[u8]) -> Result<Option<GameState>, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_len_matches_shape() {
        let shape = FrameShape {
            width: 640,
            height: 360,
            channels: 4,
        };
        assert_eq!(shape.byte_len(), 640 * 360 * 4);
    }
}
