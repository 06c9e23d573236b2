// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! Capture loop: the single producer of the session's image buffer.

use framelock_ipc::{SlotBuffer, StopFlag};
use tracing::{debug, info, warn};

use crate::engines::CaptureEngine;
use crate::error::RuntimeError;

/// Pull frames from `engine` and publish each into `images` until `stop`
/// is set. Returns the number of frames published.
///
/// The write slot is acquired, filled, and published within one iteration;
/// a capture failure discards the slot unpublished, so consumers never see
/// a partial frame. The engine is stopped before returning, error or not.
pub fn run_capture<E: CaptureEngine>(
    engine: &mut E,
    images: &mut SlotBuffer,
    stop: &StopFlag,
) -> Result<u64, RuntimeError> {
    let shape = engine.frame_shape();
    if shape.byte_len() != images.slot_size() {
        return Err(RuntimeError::ShapeMismatch {
            engine: shape.byte_len(),
            slot: images.slot_size(),
        });
    }

    engine.start()?;
    info!(
        width = shape.width,
        height = shape.height,
        channels = shape.channels,
        "capture started"
    );

    let result = capture_loop(engine, images, stop);
    if let Err(stop_err) = engine.stop() {
        // A capture error already on the way out takes precedence.
        if result.is_ok() {
            return Err(stop_err.into());
        }
        warn!(error = %stop_err, "engine shutdown failed after capture error");
    }

    let published = result?;
    info!(published, "capture stopped");
    Ok(published)
}

fn capture_loop<E: CaptureEngine>(
    engine: &mut E,
    images: &mut SlotBuffer,
    stop: &StopFlag,
) -> Result<u64, RuntimeError> {
    let mut published = 0u64;
    while !stop.is_set() {
        let mut slot = images.acquire_write_slot();
        engine.capture_into(&mut slot)?;
        slot.publish();
        published += 1;
        if published % 1000 == 0 {
            debug!(published, "capture progress");
        }
    }
    Ok(published)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::FrameShape;
    use crate::error::EngineError;

    struct FixedEngine {
        shape: FrameShape,
        value: u8,
        frames_before_stop: u32,
        stop: std::sync::Arc<StopFlag>,
        started: bool,
        stopped: bool,
    }

    impl CaptureEngine for FixedEngine {
        fn start(&mut self) -> Result<(), EngineError> {
            self.started = true;
            Ok(())
        }

        fn stop(&mut self) -> Result<(), EngineError> {
            self.stopped = true;
            Ok(())
        }

        fn frame_shape(&self) -> FrameShape {
            self.shape
        }

        fn capture_into(&mut self, frame: &mut [u8]) -> Result<(), EngineError> {
            frame.fill(self.value);
            self.frames_before_stop -= 1;
            if self.frames_before_stop == 0 {
                self.stop.trigger();
            }
            Ok(())
        }
    }

    #[test]
    fn publishes_until_stop_and_shuts_engine_down() {
        let dir = tempfile::tempdir().unwrap();
        let shape = FrameShape {
            width: 4,
            height: 2,
            channels: 1,
        };
        let mut images = SlotBuffer::create(dir.path(), "cap", 3, shape.byte_len()).unwrap();
        let stop = std::sync::Arc::new(StopFlag::create(dir.path(), "cap_stop").unwrap());

        let mut engine = FixedEngine {
            shape,
            value: 0x5C,
            frames_before_stop: 5,
            stop: stop.clone(),
            started: false,
            stopped: false,
        };

        let published = run_capture(&mut engine, &mut images, &stop).unwrap();
        assert_eq!(published, 5);
        assert!(engine.started && engine.stopped);

        let reader = SlotBuffer::open(dir.path(), "cap").unwrap();
        let mut out = vec![0u8; shape.byte_len()];
        assert_eq!(reader.read_latest(&mut out).unwrap(), 5);
        assert!(out.iter().all(|&b| b == 0x5C));
    }

    #[test]
    fn shape_mismatch_is_fatal_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let shape = FrameShape {
            width: 4,
            height: 4,
            channels: 4,
        };
        let mut images = SlotBuffer::create(dir.path(), "mis", 3, 8).unwrap();
        let stop = std::sync::Arc::new(StopFlag::create(dir.path(), "mis_stop").unwrap());
        let mut engine = FixedEngine {
            shape,
            value: 0,
            frames_before_stop: 1,
            stop: stop.clone(),
            started: false,
            stopped: false,
        };
        assert!(matches!(
            run_capture(&mut engine, &mut images, &stop),
            Err(RuntimeError::ShapeMismatch { engine: 64, slot: 8 })
        ));
        assert!(!engine.started);
    }

    #[test]
    fn failed_capture_leaves_slot_unpublished() {
        struct FailingEngine;

        impl CaptureEngine for FailingEngine {
            fn start(&mut self) -> Result<(), EngineError> {
                Ok(())
            }
            fn stop(&mut self) -> Result<(), EngineError> {
                Ok(())
            }
            fn frame_shape(&self) -> FrameShape {
                FrameShape {
                    width: 2,
                    height: 2,
                    channels: 1,
                }
            }
            fn capture_into(&mut self, _frame: &mut [u8]) -> Result<(), EngineError> {
                Err(EngineError::Device("stream lost".into()))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let mut images = SlotBuffer::create(dir.path(), "fail", 2, 4).unwrap();
        let stop = StopFlag::create(dir.path(), "fail_stop").unwrap();

        let err = run_capture(&mut FailingEngine, &mut images, &stop).unwrap_err();
        assert!(matches!(err, RuntimeError::Engine(EngineError::Device(_))));
        assert_eq!(images.generation(), 0);
    }
}
