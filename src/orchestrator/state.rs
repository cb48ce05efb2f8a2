//! Driver State Management and Phase Tracking
//!
//! - `DriverPhase`: discrete phases of one driver run
//! - `DriverState`: current phase, unit counters and error for a run
//!
//! Phases advance strictly forward; `Failed` is reachable from every
//! non-terminal phase.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

use crate::error::BuildError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriverPhase {
    /// Nothing has run yet
    Idle,

    /// Listing the source directory
    Discovery,

    /// Invoking the build command once per unit
    Building,

    /// Writing the app bundle manifest
    Bundling,

    Completed,

    Failed,
}

impl DriverPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverPhase::Idle => "idle",
            DriverPhase::Discovery => "discovery",
            DriverPhase::Building => "building",
            DriverPhase::Bundling => "bundling",
            DriverPhase::Completed => "completed",
            DriverPhase::Failed => "failed",
        }
    }

    /// Get all valid phase transitions FROM this phase.
    pub fn valid_next_phases(&self) -> Vec<DriverPhase> {
        match self {
            DriverPhase::Idle => vec![DriverPhase::Discovery, DriverPhase::Failed],
            DriverPhase::Discovery => vec![DriverPhase::Building, DriverPhase::Failed],
            DriverPhase::Building => vec![
                DriverPhase::Bundling,
                DriverPhase::Completed,
                DriverPhase::Failed,
            ],
            DriverPhase::Bundling => vec![DriverPhase::Completed, DriverPhase::Failed],
            DriverPhase::Completed => vec![],
            DriverPhase::Failed => vec![],
        }
    }

    pub fn can_transition_to(&self, next: DriverPhase) -> bool {
        self.valid_next_phases().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DriverPhase::Completed | DriverPhase::Failed)
    }
}

impl fmt::Display for DriverPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress snapshot of one driver run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverState {
    pub phase: DriverPhase,
    pub units_total: usize,
    pub units_done: usize,
    pub units_failed: usize,
    pub start_time: SystemTime,
    pub last_update_time: SystemTime,
    /// Error message if the run failed
    pub error: Option<String>,
}

impl Default for DriverState {
    fn default() -> Self {
        let now = SystemTime::now();
        DriverState {
            phase: DriverPhase::Idle,
            units_total: 0,
            units_done: 0,
            units_failed: 0,
            start_time: now,
            last_update_time: now,
            error: None,
        }
    }
}

impl DriverState {
    /// Move to `next`, rejecting transitions the phase graph does not allow.
    pub fn transition_to(&mut self, next: DriverPhase) -> Result<(), BuildError> {
        if !self.phase.can_transition_to(next) {
            return Err(BuildError::InvalidTransition {
                from: self.phase.to_string(),
                to: next.to_string(),
            });
        }
        log::debug!("Driver phase: {} -> {}", self.phase, next);
        self.phase = next;
        self.last_update_time = SystemTime::now();
        Ok(())
    }

    /// Record a failure and move to `Failed` unless already terminal.
    pub fn fail(&mut self, error: &BuildError) {
        self.error = Some(error.to_string());
        if self.phase.can_transition_to(DriverPhase::Failed) {
            log::debug!("Driver phase: {} -> {}", self.phase, DriverPhase::Failed);
            self.phase = DriverPhase::Failed;
            self.last_update_time = SystemTime::now();
        }
    }

    pub fn record_unit(&mut self, succeeded: bool) {
        self.units_done += 1;
        if !succeeded {
            self.units_failed += 1;
        }
        self.last_update_time = SystemTime::now();
    }
}
