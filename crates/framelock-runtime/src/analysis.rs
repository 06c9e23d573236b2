// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! Analysis loops: consumers of the image buffer, producers of the frame
//! record buffer and the broadcast channels.
//!
//! Both loops are generation-gated: they sleep until the image buffer's
//! generation moves past the last frame they processed, so an idle capture
//! side costs nothing but the probe. A frame published and replaced while
//! a loop was busy is skipped, never queued.

use std::time::Duration;

use framelock_ipc::{
    BroadcastChannel, FrameIndex, FrameRecord, IpcError, SlotBuffer, StateBuffer, StopFlag,
};
use tracing::{debug, info, trace, warn};

use crate::engines::{FrameAnalyzer, StateDetector};
use crate::error::RuntimeError;

/// Analyze each fresh frame and publish the reading twice: the full record
/// into `records`, and the logical frame counter onto `frames` for
/// scheduler wakeups. Runs until `stop` is set; returns frames analyzed.
///
/// Publishes [`FrameRecord::unset`] once at startup so consumers attaching
/// early read "no reading yet" instead of a zeroed record that looks real.
pub fn run_analysis<A: FrameAnalyzer>(
    analyzer: &mut A,
    images: &SlotBuffer,
    records: &mut StateBuffer<FrameRecord>,
    frames: &mut BroadcastChannel<FrameIndex>,
    poll_interval: Duration,
    stop: &StopFlag,
) -> Result<u64, RuntimeError> {
    records.set(&FrameRecord::unset())?;
    info!("analysis started");

    // Cursor starts at 0 so a frame published before the loop attached is
    // still analyzed once.
    let mut frame = vec![0u8; images.slot_size()];
    let mut last_seen = 0u64;
    let mut analyzed = 0u64;

    while !stop.is_set() {
        let generation = images.generation();
        if generation <= last_seen {
            std::thread::sleep(poll_interval);
            continue;
        }
        match images.read_latest(&mut frame) {
            Ok(generation) => last_seen = generation,
            // Producer lapped the copy; the frame is already stale.
            Err(IpcError::TornRead { retries }) => {
                trace!(retries, "image read torn, skipping frame");
                continue;
            }
            Err(e) => return Err(e.into()),
        }

        if let Some(record) = analyzer.analyze(&frame)? {
            records.set(&record)?;
            if record.has_reading() {
                frames.set(record.total_frames as FrameIndex)?;
            }
            analyzed += 1;
            if analyzed % 1000 == 0 {
                debug!(analyzed, total_frames = record.total_frames, "analysis progress");
            }
        }
    }

    info!(analyzed, "analysis stopped");
    Ok(analyzed)
}

/// Classify each fresh frame and broadcast the wire-form state. Duplicate
/// detections are broadcast as-is; deduplication is the receiver's concern.
/// Runs until `stop` is set; returns frames classified.
pub fn run_state_detection<D: StateDetector>(
    detector: &mut D,
    images: &SlotBuffer,
    states: &mut BroadcastChannel<u32>,
    poll_interval: Duration,
    stop: &StopFlag,
) -> Result<u64, RuntimeError> {
    info!("state detection started");

    let mut frame = vec![0u8; images.slot_size()];
    let mut last_seen = 0u64;
    let mut classified = 0u64;

    while !stop.is_set() {
        let generation = images.generation();
        if generation <= last_seen {
            std::thread::sleep(poll_interval);
            continue;
        }
        match images.read_latest(&mut frame) {
            Ok(generation) => last_seen = generation,
            Err(IpcError::TornRead { retries }) => {
                trace!(retries, "image read torn, skipping frame");
                continue;
            }
            Err(e) => return Err(e.into()),
        }

        match detector.detect(&frame)? {
            Some(state) => {
                states.set(state.to_wire())?;
                classified += 1;
            }
            None => warn!("frame could not be classified"),
        }
    }

    info!(classified, "state detection stopped");
    Ok(classified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use framelock_ipc::GameState;

    /// Reads the frame counter the first payload byte encodes.
    struct ByteAnalyzer;

    impl FrameAnalyzer for ByteAnalyzer {
        fn analyze(&mut self, frame: &[u8]) -> Result<Option<FrameRecord>, EngineError> {
            if frame[0] == 0xFF {
                return Ok(None);
            }
            Ok(Some(FrameRecord {
                total_frames: frame[0] as i64,
                logical_frame: frame[0] as i32,
                cycle_index: 0,
                timestamp_us: 0,
            }))
        }
    }

    struct ByteDetector;

    impl StateDetector for ByteDetector {
        fn detect(&mut self, frame: &[u8]) -> Result<Option<GameState>, EngineError> {
            Ok(Some(if frame[0] >= 10 {
                GameState::Lost
            } else {
                GameState::Running
            }))
        }
    }

    fn publish(images: &mut SlotBuffer, value: u8) {
        let mut slot = images.acquire_write_slot();
        slot.fill(value);
        slot.publish();
    }

    #[test]
    fn analysis_publishes_record_and_frame_counter() {
        let dir = tempfile::tempdir().unwrap();
        let mut images = SlotBuffer::create(dir.path(), "img", 3, 16).unwrap();
        let images_reader = SlotBuffer::open(dir.path(), "img").unwrap();
        let mut records = StateBuffer::<FrameRecord>::create(dir.path(), "rec").unwrap();
        let records_reader = StateBuffer::<FrameRecord>::open(dir.path(), "rec").unwrap();
        let mut frames = BroadcastChannel::<FrameIndex>::create(dir.path(), "frames").unwrap();
        let frames_reader = BroadcastChannel::<FrameIndex>::open(dir.path(), "frames").unwrap();
        let stop = StopFlag::create(dir.path(), "stop").unwrap();

        publish(&mut images, 7);

        // Run the loop on a thread; stop it once the reading lands.
        let stop_handle = StopFlag::open(dir.path(), "stop").unwrap();
        let loop_thread = std::thread::spawn(move || {
            let mut analyzer = ByteAnalyzer;
            run_analysis(
                &mut analyzer,
                &images_reader,
                &mut records,
                &mut frames,
                Duration::from_micros(200),
                &stop_handle,
            )
        });

        let mut subscriber = frames_reader.subscribe();
        let value = subscriber.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(value, Some(7));

        let (record, _) = records_reader.get().unwrap();
        assert_eq!(record.total_frames, 7);

        stop.trigger();
        let analyzed = loop_thread.join().unwrap().unwrap();
        assert_eq!(analyzed, 1);
    }

    #[test]
    fn unreadable_frames_publish_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut images = SlotBuffer::create(dir.path(), "img", 3, 16).unwrap();
        let images_reader = SlotBuffer::open(dir.path(), "img").unwrap();
        let mut records = StateBuffer::<FrameRecord>::create(dir.path(), "rec").unwrap();
        let records_reader = StateBuffer::<FrameRecord>::open(dir.path(), "rec").unwrap();
        let mut frames = BroadcastChannel::<FrameIndex>::create(dir.path(), "frames").unwrap();
        let stop = StopFlag::create(dir.path(), "stop").unwrap();

        // 0xFF = analyzer returns no reading.
        publish(&mut images, 0xFF);

        let stop_handle = StopFlag::open(dir.path(), "stop").unwrap();
        let loop_thread = std::thread::spawn(move || {
            let mut analyzer = ByteAnalyzer;
            run_analysis(
                &mut analyzer,
                &images_reader,
                &mut records,
                &mut frames,
                Duration::from_micros(200),
                &stop_handle,
            )
        });

        std::thread::sleep(Duration::from_millis(50));
        stop.trigger();
        let analyzed = loop_thread.join().unwrap().unwrap();
        assert_eq!(analyzed, 0);

        // Startup sentinel stands, untouched by the unreadable frame.
        let (record, _) = records_reader.get().unwrap();
        assert!(!record.has_reading());
    }

    #[test]
    fn detection_broadcasts_wire_states() {
        let dir = tempfile::tempdir().unwrap();
        let mut images = SlotBuffer::create(dir.path(), "img", 3, 8).unwrap();
        let images_reader = SlotBuffer::open(dir.path(), "img").unwrap();
        let mut states = BroadcastChannel::<u32>::create(dir.path(), "states").unwrap();
        let states_reader = BroadcastChannel::<u32>::open(dir.path(), "states").unwrap();
        let stop = StopFlag::create(dir.path(), "stop").unwrap();

        publish(&mut images, 12);

        let stop_handle = StopFlag::open(dir.path(), "stop").unwrap();
        let loop_thread = std::thread::spawn(move || {
            let mut detector = ByteDetector;
            run_state_detection(
                &mut detector,
                &images_reader,
                &mut states,
                Duration::from_micros(200),
                &stop_handle,
            )
        });

        let mut subscriber = states_reader.subscribe();
        let wire = subscriber.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(wire.map(GameState::from_wire), Some(GameState::Lost));

        stop.trigger();
        let classified = loop_thread.join().unwrap().unwrap();
        assert_eq!(classified, 1);
    }
}
