// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! Action plans: ordered, immutable lists of frame-triggered actions.
//!
//! Plans are authored as YAML, one entry per action:
//!
//! ```yaml
//! - trigger_frame: 50
//!   kind: click
//!   x: 960
//!   y: 540
//! - trigger_frame: 50
//!   kind: drag
//!   from_x: 200
//!   from_y: 800
//!   to_x: 640
//!   to_y: 400
//!   duration_ms: 300
//! - trigger_frame: 100
//!   kind: wait
//!   duration_ms: 50
//! ```
//!
//! Ties on `trigger_frame` mean "same frame, multiple actions"; list order
//! is execution order. Malformed entries (unknown kind, negative trigger
//! frame, out-of-order triggers) are rejected at load time, never at
//! execution time.

use std::path::Path;

use framelock_ipc::FrameIndex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PlanError;

/// One device-level action. Kind-specific parameters live on the variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Click {
        x: u32,
        y: u32,
    },
    Drag {
        from_x: u32,
        from_y: u32,
        to_x: u32,
        to_y: u32,
        duration_ms: u32,
    },
    Wait {
        duration_ms: u32,
    },
}

/// One plan entry: an action bound to the logical frame it must fire on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedAction {
    pub trigger_frame: FrameIndex,
    #[serde(flatten)]
    pub action: Action,
}

/// Validated, read-only action plan. Loaded once per run, immutable
/// thereafter; the scheduler tracks its own cursor separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPlan {
    entries: Vec<PlannedAction>,
}

impl ActionPlan {
    /// Validate an in-memory entry list. Trigger frames must be
    /// non-decreasing; an out-of-order plan is an authoring error, not
    /// something to silently reorder.
    pub fn new(entries: Vec<PlannedAction>) -> Result<Self, PlanError> {
        for (index, pair) in entries.windows(2).enumerate() {
            if pair[1].trigger_frame < pair[0].trigger_frame {
                return Err(PlanError::NonMonotonic {
                    index: index + 1,
                    frame: pair[1].trigger_frame,
                    previous: pair[0].trigger_frame,
                });
            }
        }
        Ok(Self { entries })
    }

    pub fn from_yaml(source: &str) -> Result<Self, PlanError> {
        let entries: Vec<PlannedAction> = serde_yaml::from_str(source)?;
        Self::new(entries)
    }

    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let source = std::fs::read_to_string(path)?;
        let plan = Self::from_yaml(&source)?;
        info!(
            path = %path.display(),
            actions = plan.len(),
            "loaded action plan"
        );
        Ok(plan)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PlannedAction] {
        &self.entries
    }
}
