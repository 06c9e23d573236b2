// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! The commander: fires planned actions at exact logical frames.
//!
//! The scheduler owns a validated [`ActionPlan`] and a private cursor, and
//! consumes frame indices from the analysis side's broadcast channel. The
//! producer cadence is unrelated to the frame cadence, so the loop must
//! handle three shapes of input: frames before the next target (no-op),
//! the target frame itself, and frames past the target (the analysis layer
//! skipped over it). Skipped targets are executed immediately by default —
//! the controlled game will not rewind — with the policy configurable for
//! pipelines that prefer dropping missed actions.

use std::time::Duration;

use framelock_ipc::{FrameIndex, IpcError, StopFlag, Subscriber};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::driver::CommandDriver;
use crate::error::SchedulerError;
use crate::plan::ActionPlan;

/// What to do with an action whose trigger frame was jumped over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipPolicy {
    /// Execute the missed action immediately on the first later frame.
    #[default]
    ExecuteLate,
    /// Drop the missed action and advance the cursor past it.
    Drop,
}

/// Scheduler lifecycle phases; `Done` and `Aborted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Initial state, entered before any frame has been observed.
    WaitingForFrame,
    AtTarget,
    Executing,
    Done,
    Aborted,
}

/// How a scheduler run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Cursor passed the last planned action.
    Completed,
    /// External stop signal observed.
    Stopped,
}

/// Tunables for the reaction loop.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Per-wait timeout on the input channel. A timeout is a liveness
    /// check, not an error.
    pub wait_timeout: Duration,
    /// Consecutive timeouts after which the run aborts with
    /// [`SchedulerError::ChannelStalled`].
    pub max_consecutive_timeouts: u32,
    /// Warn when a trigger frame was overshot by more than this many
    /// frames; larger jumps suggest the analysis layer lost tracking.
    pub skip_warn_tolerance: u64,
    pub skip_policy: SkipPolicy,
    /// Keep executing subsequent actions after a driver failure instead of
    /// aborting the run.
    pub continue_on_error: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_millis(500),
            max_consecutive_timeouts: 20,
            skip_warn_tolerance: 5,
            skip_policy: SkipPolicy::default(),
            continue_on_error: false,
        }
    }
}

/// Frame-synchronized action scheduler (single consumer of one frame
/// channel; owns its plan cursor exclusively).
pub struct FrameScheduler<D: CommandDriver> {
    plan: ActionPlan,
    config: SchedulerConfig,
    driver: D,
    cursor: usize,
    last_frame: Option<FrameIndex>,
    phase: Phase,
}

impl<D: CommandDriver> FrameScheduler<D> {
    pub fn new(plan: ActionPlan, config: SchedulerConfig, driver: D) -> Self {
        let phase = if plan.is_empty() {
            Phase::Done
        } else {
            Phase::WaitingForFrame
        };
        Self {
            plan,
            config,
            driver,
            cursor: 0,
            last_frame: None,
            phase,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Index of the next unexecuted plan entry.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn last_frame(&self) -> Option<FrameIndex> {
        self.last_frame
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Main reaction loop. Blocks until the plan completes, the stop flag
    /// is raised, or the run fails structurally.
    pub fn run(
        &mut self,
        frames: &mut Subscriber<'_, FrameIndex>,
        stop: &StopFlag,
    ) -> Result<RunOutcome, SchedulerError> {
        let mut consecutive_timeouts = 0u32;
        info!(actions = self.plan.len(), "commander entering main loop");

        while self.phase != Phase::Done {
            if stop.is_set() {
                info!("stop signal observed, leaving commander loop");
                return Ok(RunOutcome::Stopped);
            }
            let event = frames.wait(self.config.wait_timeout);
            self.handle_wait(event, &mut consecutive_timeouts)?;
        }

        info!("all planned actions executed");
        Ok(RunOutcome::Completed)
    }

    /// Fold one channel wait into the scheduler. Every structural failure
    /// leaves the scheduler `Aborted` before the error propagates, so
    /// `phase()` never reports a live state for a dead run.
    fn handle_wait(
        &mut self,
        event: Result<Option<FrameIndex>, IpcError>,
        consecutive_timeouts: &mut u32,
    ) -> Result<(), SchedulerError> {
        match event {
            Ok(Some(frame)) => {
                *consecutive_timeouts = 0;
                self.on_frame(frame)
            }
            Ok(None) => {
                *consecutive_timeouts += 1;
                warn!(
                    consecutive_timeouts = *consecutive_timeouts,
                    max = self.config.max_consecutive_timeouts,
                    "no frame update within timeout"
                );
                if *consecutive_timeouts >= self.config.max_consecutive_timeouts {
                    self.phase = Phase::Aborted;
                    return Err(SchedulerError::ChannelStalled {
                        timeouts: *consecutive_timeouts,
                    });
                }
                Ok(())
            }
            Err(source) => {
                self.phase = Phase::Aborted;
                Err(source.into())
            }
        }
    }

    /// React to one observed frame index. Executes every plan entry whose
    /// trigger frame is at or before `frame`, in plan order, exactly once.
    pub fn on_frame(&mut self, frame: FrameIndex) -> Result<(), SchedulerError> {
        if matches!(self.phase, Phase::Done | Phase::Aborted) {
            return Ok(());
        }
        if let Some(last) = self.last_frame {
            if frame < last {
                warn!(frame, last, "frame index regressed; session reset upstream?");
            }
        }
        self.last_frame = Some(frame);

        while self.cursor < self.plan.len() {
            let entry = &self.plan.entries()[self.cursor];
            let target = entry.trigger_frame;
            if frame < target {
                break;
            }

            if frame > target {
                let overshoot = frame - target;
                if overshoot > self.config.skip_warn_tolerance {
                    warn!(
                        frame,
                        target,
                        overshoot,
                        "trigger frame skipped by more than the tolerance; \
                         analysis may have lost tracking"
                    );
                } else {
                    debug!(frame, target, overshoot, "trigger frame overshot");
                }
                if self.config.skip_policy == SkipPolicy::Drop {
                    warn!(target, index = self.cursor, "dropping missed action");
                    self.cursor += 1;
                    continue;
                }
            } else {
                self.phase = Phase::AtTarget;
            }

            let index = self.cursor;
            let action = entry.action.clone();
            self.phase = Phase::Executing;
            match self.driver.execute(&action) {
                Ok(()) => {
                    debug!(frame, target, index, ?action, "executed planned action");
                }
                Err(source) => {
                    if self.config.continue_on_error {
                        warn!(frame, index, error = %source, "driver failed, continuing per config");
                    } else {
                        self.phase = Phase::Aborted;
                        return Err(SchedulerError::Driver { index, source });
                    }
                }
            }
            self.cursor += 1;
        }

        self.phase = if self.cursor >= self.plan.len() {
            Phase::Done
        } else {
            Phase::WaitingForFrame
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriverError;
    use crate::plan::{Action, PlannedAction};

    struct RecordingDriver {
        executed: Vec<Action>,
        fail_on: Option<Action>,
    }

    impl RecordingDriver {
        fn new() -> Self {
            Self {
                executed: Vec::new(),
                fail_on: None,
            }
        }
    }

    impl CommandDriver for RecordingDriver {
        fn execute(&mut self, action: &Action) -> Result<(), DriverError> {
            if self.fail_on.as_ref() == Some(action) {
                return Err(DriverError::Rejected("simulated".into()));
            }
            self.executed.push(action.clone());
            Ok(())
        }
    }

    fn click(x: u32) -> Action {
        Action::Click { x, y: 0 }
    }

    fn plan(entries: &[(u64, Action)]) -> ActionPlan {
        ActionPlan::new(
            entries
                .iter()
                .map(|(trigger_frame, action)| PlannedAction {
                    trigger_frame: *trigger_frame,
                    action: action.clone(),
                })
                .collect(),
        )
        .unwrap()
    }

    fn executed(scheduler: FrameScheduler<RecordingDriver>) -> Vec<Action> {
        scheduler.into_driver().executed
    }

    /// Same-frame batching plus skip-forward execution: plan
    /// [{50, A}, {50, B}, {100, C}] against frames 0, 10, 51, 99, 101.
    #[test]
    fn batches_ties_and_executes_skipped_targets() {
        let plan = plan(&[(50, click(1)), (50, click(2)), (100, click(3))]);
        let mut scheduler =
            FrameScheduler::new(plan, SchedulerConfig::default(), RecordingDriver::new());

        for frame in [0u64, 10] {
            scheduler.on_frame(frame).unwrap();
            assert_eq!(scheduler.cursor(), 0);
            assert_eq!(scheduler.phase(), Phase::WaitingForFrame);
        }

        // Frame 51 jumped past both 50-triggers: execute A then B now.
        scheduler.on_frame(51).unwrap();
        assert_eq!(scheduler.cursor(), 2);
        assert_eq!(scheduler.phase(), Phase::WaitingForFrame);

        scheduler.on_frame(99).unwrap();
        assert_eq!(scheduler.cursor(), 2);

        scheduler.on_frame(101).unwrap();
        assert_eq!(scheduler.phase(), Phase::Done);
        assert_eq!(executed(scheduler), vec![click(1), click(2), click(3)]);
    }

    #[test]
    fn never_reaching_target_executes_nothing() {
        let plan = plan(&[(10, click(1))]);
        let mut scheduler =
            FrameScheduler::new(plan, SchedulerConfig::default(), RecordingDriver::new());

        for frame in [0u64, 5, 9] {
            scheduler.on_frame(frame).unwrap();
        }
        assert_eq!(scheduler.phase(), Phase::WaitingForFrame);
        assert_eq!(scheduler.cursor(), 0);
        assert!(executed(scheduler).is_empty());
    }

    #[test]
    fn exact_target_frame_fires_once() {
        let plan = plan(&[(10, click(1))]);
        let mut scheduler =
            FrameScheduler::new(plan, SchedulerConfig::default(), RecordingDriver::new());

        scheduler.on_frame(10).unwrap();
        assert_eq!(scheduler.phase(), Phase::Done);
        // Duplicate notification of the same frame must not re-fire.
        scheduler.on_frame(10).unwrap();
        assert_eq!(executed(scheduler), vec![click(1)]);
    }

    #[test]
    fn drop_policy_discards_missed_actions() {
        let plan = plan(&[(50, click(1)), (100, click(2))]);
        let config = SchedulerConfig {
            skip_policy: SkipPolicy::Drop,
            ..SchedulerConfig::default()
        };
        let mut scheduler = FrameScheduler::new(plan, config, RecordingDriver::new());

        scheduler.on_frame(60).unwrap(); // 50 missed: dropped
        scheduler.on_frame(100).unwrap(); // 100 hit exactly: fires
        assert_eq!(scheduler.phase(), Phase::Done);
        assert_eq!(executed(scheduler), vec![click(2)]);
    }

    #[test]
    fn driver_failure_aborts_without_retry() {
        let plan = plan(&[(10, click(1)), (20, click(2))]);
        let mut driver = RecordingDriver::new();
        driver.fail_on = Some(click(1));
        let mut scheduler = FrameScheduler::new(plan, SchedulerConfig::default(), driver);

        let err = scheduler.on_frame(10).unwrap_err();
        assert!(matches!(err, SchedulerError::Driver { index: 0, .. }));
        assert_eq!(scheduler.phase(), Phase::Aborted);

        // Terminal: later frames are ignored.
        scheduler.on_frame(20).unwrap();
        assert!(executed(scheduler).is_empty());
    }

    #[test]
    fn continue_on_error_skips_failed_action() {
        let plan = plan(&[(10, click(1)), (10, click(2))]);
        let config = SchedulerConfig {
            continue_on_error: true,
            ..SchedulerConfig::default()
        };
        let mut driver = RecordingDriver::new();
        driver.fail_on = Some(click(1));
        let mut scheduler = FrameScheduler::new(plan, config, driver);

        scheduler.on_frame(10).unwrap();
        assert_eq!(scheduler.phase(), Phase::Done);
        assert_eq!(executed(scheduler), vec![click(2)]);
    }

    #[test]
    fn empty_plan_is_done_immediately() {
        let scheduler = FrameScheduler::new(
            ActionPlan::new(Vec::new()).unwrap(),
            SchedulerConfig::default(),
            RecordingDriver::new(),
        );
        assert_eq!(scheduler.phase(), Phase::Done);
    }

    #[test]
    fn stalled_channel_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let channel =
            framelock_ipc::BroadcastChannel::<u64>::create(dir.path(), "stall").unwrap();
        let stop = StopFlag::create(dir.path(), "stall_stop").unwrap();

        let config = SchedulerConfig {
            wait_timeout: Duration::from_millis(5),
            max_consecutive_timeouts: 3,
            ..SchedulerConfig::default()
        };
        let mut scheduler =
            FrameScheduler::new(plan(&[(10, click(1))]), config, RecordingDriver::new());
        let mut subscriber = channel.subscribe();

        let err = scheduler.run(&mut subscriber, &stop).unwrap_err();
        assert!(matches!(err, SchedulerError::ChannelStalled { timeouts: 3 }));
        assert_eq!(scheduler.phase(), Phase::Aborted);
    }

    #[test]
    fn channel_error_leaves_scheduler_aborted() {
        let mut scheduler = FrameScheduler::new(
            plan(&[(10, click(1))]),
            SchedulerConfig::default(),
            RecordingDriver::new(),
        );

        let mut timeouts = 0u32;
        let err = scheduler
            .handle_wait(
                Err(IpcError::Truncated {
                    expected: 64,
                    actual: 0,
                }),
                &mut timeouts,
            )
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Ipc(_)));
        // A dead run must not keep reporting a live phase.
        assert_eq!(scheduler.phase(), Phase::Aborted);
    }

    #[test]
    fn stop_flag_ends_run_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let channel =
            framelock_ipc::BroadcastChannel::<u64>::create(dir.path(), "halt").unwrap();
        let stop = StopFlag::create(dir.path(), "halt_stop").unwrap();
        stop.trigger();

        let mut scheduler = FrameScheduler::new(
            plan(&[(10, click(1))]),
            SchedulerConfig::default(),
            RecordingDriver::new(),
        );
        let mut subscriber = channel.subscribe();
        let outcome = scheduler.run(&mut subscriber, &stop).unwrap();
        assert_eq!(outcome, RunOutcome::Stopped);
    }
}
