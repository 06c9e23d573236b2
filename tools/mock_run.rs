// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

/*!
Mock Session Runner

Runs the full framelock dataflow inside one process: a mock capture engine
publishes counter-stamped frames into a shared slot buffer, analysis and
state-detection loops consume them, and the commander plus the lifecycle
manager fire a small inline plan through a recording driver.

Usage:
  cargo run --bin framelock-mock-run [config.toml]

Without an argument the default configuration is used; no config file is
required. Regions are created under the configured region directory with a
pid-suffixed prefix and removed on exit.
*/

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{error, info};

use framelock::config::{load_config, ConfigError, FramelockConfig};
use framelock::ipc::{
    BroadcastChannel, FrameIndex, FrameRecord, GameState, SlotBuffer, StateBuffer, StopFlag,
};
use framelock::runtime::{
    run_analysis, run_capture, run_state_detection, CounterAnalyzer, FrameShape,
    MockCaptureEngine, MockDriver, SessionNames, ThresholdStateDetector,
};
use framelock::scheduler::{
    Action, ActionPlan, FrameScheduler, RunOutcome, StateScheduler, StateTrigger,
};

const DEMO_PLAN: &str = r#"
- trigger_frame: 30
  kind: click
  x: 960
  y: 540
- trigger_frame: 60
  kind: drag
  from_x: 200
  from_y: 800
  to_x: 640
  to_y: 400
  duration_ms: 100
- trigger_frame: 120
  kind: wait
  duration_ms: 20
"#;

/// Mock counter value at which the state detector reports `Lost`.
const LOST_AT_FRAME: u32 = 80;

fn main() -> Result<()> {
    let config_arg = std::env::args().nth(1).map(std::path::PathBuf::from);
    let config = match load_config(config_arg.as_deref()) {
        Ok(config) => config,
        // A missing default config is fine for a demo run.
        Err(ConfigError::FileNotFound(_)) if config_arg.is_none() => FramelockConfig::default(),
        Err(e) => return Err(e).context("failed to load configuration"),
    };
    framelock::logging::init(&config.logging.filter);

    // Pid suffix isolates this run from any concurrent session.
    let names = SessionNames::new(format!(
        "{}_{}",
        config.session.name_prefix,
        std::process::id()
    ));
    let dir = config.session.region_dir.clone();
    info!(prefix = names.prefix(), dir = %dir.display(), "starting mock session");

    // A small frame keeps the demo light; the counter only needs 3 bytes.
    let shape = FrameShape {
        width: 64,
        height: 36,
        channels: 4,
    };

    // Owner handles live in main so the regions are unlinked on exit.
    let _images = SlotBuffer::create(
        &dir,
        &names.image(),
        config.ipc.image_slots,
        shape.byte_len(),
    )?;
    let _records = StateBuffer::<FrameRecord>::create(&dir, &names.frame_record())?;
    let _frames = BroadcastChannel::<FrameIndex>::create(&dir, &names.frame_channel())?;
    let _states = BroadcastChannel::<u32>::create(&dir, &names.state_channel())?;
    let stop = StopFlag::create(&dir, &names.stop())?;

    // SIGINT/SIGTERM latches the stop flag: every loop drains, main keeps
    // unwinding normally, and the owner handles above unlink the regions.
    // Without this a Ctrl-C would kill the process before any Drop runs
    // and leak every region file.
    let signal_stop = StopFlag::open(&dir, &names.stop())?;
    ctrlc::set_handler(move || {
        info!("shutdown signal received, stopping session");
        signal_stop.trigger();
    })
    .context("failed to install signal handler")?;

    let poll_interval = config.ipc.poll_interval();
    let scheduler_config = config.scheduler.scheduler_config();

    // Capture producer.
    let capture_thread = {
        let dir = dir.clone();
        let names = names.clone();
        std::thread::spawn(move || -> Result<u64> {
            let mut engine = MockCaptureEngine::new(shape, Duration::from_millis(2));
            let mut images = SlotBuffer::open(&dir, &names.image())?;
            let stop = StopFlag::open(&dir, &names.stop())?;
            Ok(run_capture(&mut engine, &mut images, &stop)?)
        })
    };

    // Frame analysis.
    let analysis_thread = {
        let dir = dir.clone();
        let names = names.clone();
        std::thread::spawn(move || -> Result<u64> {
            let images = SlotBuffer::open(&dir, &names.image())?;
            let mut records = StateBuffer::<FrameRecord>::open(&dir, &names.frame_record())?;
            let mut frames = BroadcastChannel::<FrameIndex>::open(&dir, &names.frame_channel())?;
            let stop = StopFlag::open(&dir, &names.stop())?;
            let mut analyzer = CounterAnalyzer::new();
            Ok(run_analysis(
                &mut analyzer,
                &images,
                &mut records,
                &mut frames,
                poll_interval,
                &stop,
            )?)
        })
    };

    // State detection.
    let detection_thread = {
        let dir = dir.clone();
        let names = names.clone();
        std::thread::spawn(move || -> Result<u64> {
            let images = SlotBuffer::open(&dir, &names.image())?;
            let mut states = BroadcastChannel::<u32>::open(&dir, &names.state_channel())?;
            let stop = StopFlag::open(&dir, &names.stop())?;
            let mut detector = ThresholdStateDetector::new(LOST_AT_FRAME);
            Ok(run_state_detection(
                &mut detector,
                &images,
                &mut states,
                poll_interval,
                &stop,
            )?)
        })
    };

    // Lifecycle manager on its own thread; it runs until the stop flag.
    let lifecycle_driver = MockDriver::new();
    let lifecycle_log = lifecycle_driver.log_handle();
    let lifecycle_thread = {
        let dir = dir.clone();
        let names = names.clone();
        let scheduler_config = scheduler_config.clone();
        std::thread::spawn(move || -> Result<RunOutcome> {
            let states = BroadcastChannel::<u32>::open(&dir, &names.state_channel())?;
            let stop = StopFlag::open(&dir, &names.stop())?;
            let triggers = vec![StateTrigger {
                on_enter: GameState::Lost,
                action: Action::Click { x: 640, y: 700 },
            }];
            let mut lifecycle = StateScheduler::new(triggers, scheduler_config, lifecycle_driver);
            let mut subscriber = states.subscribe();
            Ok(lifecycle.run(&mut subscriber, &stop)?)
        })
    };

    // The commander runs on the main thread.
    let plan = ActionPlan::from_yaml(DEMO_PLAN).context("inline demo plan is invalid")?;
    let commander_driver = MockDriver::new();
    let commander_log = commander_driver.log_handle();
    let outcome = {
        let frames = BroadcastChannel::<FrameIndex>::open(&dir, &names.frame_channel())?;
        let mut commander = FrameScheduler::new(plan, scheduler_config, commander_driver);
        let mut subscriber = frames.subscribe();
        commander.run(&mut subscriber, &stop)?
    };
    info!(?outcome, "commander finished");

    // Give the lifecycle manager a moment to observe the Lost edge.
    std::thread::sleep(Duration::from_millis(200));
    stop.trigger();

    let captured = join(capture_thread, "capture")?;
    let analyzed = join(analysis_thread, "analysis")?;
    let classified = join(detection_thread, "state detection")?;
    let lifecycle_outcome = join(lifecycle_thread, "lifecycle")?;

    let planned = commander_log.lock().len();
    let recoveries = lifecycle_log.lock().len();
    info!(
        captured,
        analyzed,
        classified,
        planned,
        recoveries,
        ?lifecycle_outcome,
        "mock session complete"
    );

    // An interrupted run legitimately executes fewer actions.
    if outcome == RunOutcome::Completed && planned != 3 {
        bail!("expected 3 planned actions to execute, saw {planned}");
    }
    Ok(())
}

fn join<T>(handle: std::thread::JoinHandle<Result<T>>, what: &str) -> Result<T> {
    match handle.join() {
        Ok(result) => result.with_context(|| format!("{what} loop failed")),
        Err(_) => {
            error!(what, "loop thread panicked");
            bail!("{what} loop thread panicked");
        }
    }
}
