//! Enable/disable state for vote-casting affordances.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::VotingWindow;

/// Whether vote buttons should currently be active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    #[default]
    Enabled,
    Disabled,
}

impl GateState {
    /// The gate state for `now`, using the resolver's blackout rule.
    pub fn at(now: NaiveDateTime, window: &VotingWindow) -> Self {
        if window.is_blackout(now.time()) {
            Self::Disabled
        } else {
            Self::Enabled
        }
    }

    pub fn is_enabled(self) -> bool {
        self == Self::Enabled
    }
}

/// Remembers the last published state so only transitions are reported.
#[derive(Debug, Clone)]
pub struct VotingGate {
    window: VotingWindow,
    state: GateState,
}

impl VotingGate {
    /// A gate that starts out [`GateState::Enabled`].
    pub fn new(window: VotingWindow) -> Self {
        Self {
            window,
            state: GateState::Enabled,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Re-evaluates the gate at `now`.
    ///
    /// Returns the new state if it differs from the previous one.
    pub fn tick(&mut self, now: NaiveDateTime) -> Option<GateState> {
        let next = GateState::at(now, &self.window);
        if next == self.state {
            return None;
        }
        self.state = next;
        Some(next)
    }
}
