// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! The lifecycle manager: reacts to game-state transitions.
//!
//! Structurally the commander's reaction loop, but keyed on state edges
//! instead of frame ordering. Triggers are edge-triggered: a recovery
//! action fires exactly once when the state *enters* the configured value,
//! and again only after the state leaves and re-enters it. Remaining in a
//! triggering state does not re-fire.

use framelock_ipc::{GameState, StopFlag, Subscriber};
use tracing::{debug, info, warn};

use crate::commander::{RunOutcome, SchedulerConfig};
use crate::driver::CommandDriver;
use crate::error::SchedulerError;
use crate::plan::Action;

/// Maps entry into a state to a recovery action.
#[derive(Debug, Clone)]
pub struct StateTrigger {
    pub on_enter: GameState,
    pub action: Action,
}

/// Edge-triggered state reaction loop.
pub struct StateScheduler<D: CommandDriver> {
    triggers: Vec<StateTrigger>,
    config: SchedulerConfig,
    driver: D,
    last_state: Option<GameState>,
}

impl<D: CommandDriver> StateScheduler<D> {
    pub fn new(triggers: Vec<StateTrigger>, config: SchedulerConfig, driver: D) -> Self {
        Self {
            triggers,
            config,
            driver,
            last_state: None,
        }
    }

    pub fn last_state(&self) -> Option<GameState> {
        self.last_state
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Main reaction loop. Unlike the commander there is no plan to finish,
    /// so the loop runs until the stop flag is raised or the channel goes
    /// structurally silent.
    pub fn run(
        &mut self,
        states: &mut Subscriber<'_, u32>,
        stop: &StopFlag,
    ) -> Result<RunOutcome, SchedulerError> {
        let mut consecutive_timeouts = 0u32;
        info!(triggers = self.triggers.len(), "lifecycle manager entering main loop");

        loop {
            if stop.is_set() {
                info!("stop signal observed, leaving lifecycle loop");
                return Ok(RunOutcome::Stopped);
            }
            match states.wait(self.config.wait_timeout)? {
                Some(raw) => {
                    consecutive_timeouts = 0;
                    self.on_state(GameState::from_wire(raw))?;
                }
                None => {
                    consecutive_timeouts += 1;
                    debug!(consecutive_timeouts, "no state update within timeout");
                    if consecutive_timeouts >= self.config.max_consecutive_timeouts {
                        return Err(SchedulerError::ChannelStalled {
                            timeouts: consecutive_timeouts,
                        });
                    }
                }
            }
        }
    }

    /// React to one observed state. Fires matching triggers only on the
    /// transition into `state`.
    pub fn on_state(&mut self, state: GameState) -> Result<(), SchedulerError> {
        if self.last_state == Some(state) {
            return Ok(());
        }
        let previous = self.last_state.replace(state);

        let actions: Vec<(usize, Action)> = self
            .triggers
            .iter()
            .enumerate()
            .filter(|(_, trigger)| trigger.on_enter == state)
            .map(|(index, trigger)| (index, trigger.action.clone()))
            .collect();

        if actions.is_empty() {
            debug!(?previous, ?state, "state transition, no trigger");
            return Ok(());
        }

        info!(?previous, ?state, count = actions.len(), "state transition trigger");
        for (index, action) in actions {
            match self.driver.execute(&action) {
                Ok(()) => debug!(?state, index, ?action, "executed recovery action"),
                Err(source) => {
                    if self.config.continue_on_error {
                        warn!(?state, index, error = %source, "recovery driver failed, continuing per config");
                    } else {
                        return Err(SchedulerError::Driver { index, source });
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriverError;

    struct CountingDriver {
        fired: Vec<Action>,
        fail: bool,
    }

    impl CommandDriver for CountingDriver {
        fn execute(&mut self, action: &Action) -> Result<(), DriverError> {
            if self.fail {
                return Err(DriverError::Unavailable("simulated".into()));
            }
            self.fired.push(action.clone());
            Ok(())
        }
    }

    fn retry_action() -> Action {
        Action::Click { x: 640, y: 700 }
    }

    fn scheduler(fail: bool) -> StateScheduler<CountingDriver> {
        StateScheduler::new(
            vec![StateTrigger {
                on_enter: GameState::Lost,
                action: retry_action(),
            }],
            SchedulerConfig::default(),
            CountingDriver {
                fired: Vec::new(),
                fail,
            },
        )
    }

    /// RUNNING, RUNNING, LOST, LOST, RUNNING, LOST fires exactly twice.
    #[test]
    fn fires_once_per_transition() {
        let mut lifecycle = scheduler(false);
        for state in [
            GameState::Running,
            GameState::Running,
            GameState::Lost,
            GameState::Lost,
            GameState::Running,
            GameState::Lost,
        ] {
            lifecycle.on_state(state).unwrap();
        }
        assert_eq!(lifecycle.last_state(), Some(GameState::Lost));
        assert_eq!(
            lifecycle.into_driver().fired,
            vec![retry_action(), retry_action()]
        );
    }

    #[test]
    fn initial_state_can_trigger() {
        let mut lifecycle = scheduler(false);
        lifecycle.on_state(GameState::Lost).unwrap();
        assert_eq!(lifecycle.into_driver().fired, vec![retry_action()]);
    }

    #[test]
    fn untriggered_states_do_nothing() {
        let mut lifecycle = scheduler(false);
        for state in [GameState::Running, GameState::Paused, GameState::Won] {
            lifecycle.on_state(state).unwrap();
        }
        assert!(lifecycle.into_driver().fired.is_empty());
    }

    #[test]
    fn driver_failure_surfaces() {
        let mut lifecycle = scheduler(true);
        let err = lifecycle.on_state(GameState::Lost).unwrap_err();
        assert!(matches!(err, SchedulerError::Driver { index: 0, .. }));
    }
}
