//! Typed results of vote and cancel requests.

use serde::{Deserialize, Serialize};

use crate::{DateKey, Rejected, VotingWindow};

/// Why a vote or cancellation was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Attempted during the daily blackout.
    WindowClosed,
    /// No upcoming ordering day could be found.
    NoOrderingDay,
    /// The vote references an item missing from the current catalog.
    UnknownItem,
    /// A store call failed; the page is in whatever state the last
    /// successful call left it.
    StoreUnavailable,
    /// The store detected a conflicting concurrent write.
    ConcurrentModification,
}

impl From<Rejected> for RejectReason {
    fn from(rejected: Rejected) -> Self {
        match rejected {
            Rejected::WindowClosed => Self::WindowClosed,
            Rejected::NoOrderingDay => Self::NoOrderingDay,
        }
    }
}

/// Result of a vote or cancellation, rendered by the caller as a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VoteOutcome {
    /// The vote was recorded on `page`.
    Noted { page: DateKey },
    /// The user's row was removed from `page`.
    Cancelled { page: DateKey },
    /// There was nothing to cancel on `page`.
    NotFound { page: DateKey },
    /// Nothing was changed.
    Rejected { reason: RejectReason },
}

impl From<Rejected> for VoteOutcome {
    fn from(rejected: Rejected) -> Self {
        Self::Rejected {
            reason: rejected.into(),
        }
    }
}

impl VoteOutcome {
    /// Shorthand for a rejection.
    pub fn rejected(reason: RejectReason) -> Self {
        Self::Rejected { reason }
    }

    /// The user-facing reply for this outcome.
    pub fn reply_text(&self, window: &VotingWindow) -> String {
        match self {
            Self::Noted { page } => format!("Noted for {page}"),
            Self::Cancelled { page } => format!("Your order for {page} has been cancelled."),
            Self::NotFound { page } => format!("You have no order to cancel for {page}."),
            Self::Rejected { reason } => match reason {
                RejectReason::WindowClosed => format!(
                    "Sorry!! Restaurant is closed for today. Please place order within {}",
                    window.ordering_hours()
                ),
                RejectReason::NoOrderingDay => {
                    "Sorry!! No upcoming ordering day is scheduled.".to_string()
                }
                RejectReason::UnknownItem => "That item is not on the current menu.".to_string(),
                RejectReason::StoreUnavailable => {
                    "Could not record your vote. Please try again.".to_string()
                }
                RejectReason::ConcurrentModification => {
                    "Your vote collided with another update. Please try again.".to_string()
                }
            },
        }
    }
}
