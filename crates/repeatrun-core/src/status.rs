//! Status enums for Runs and per-item outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a Run through the orchestration state machine.
///
/// Transitions are forward-only:
/// `Pending -> AwaitingConfirmation -> Running -> {Completed, Failed, Cancelled}`,
/// with `AwaitingConfirmation -> Cancelled` on rejection. A Run never
/// re-enters an earlier state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    /// Run created but not yet presented for confirmation.
    #[default]
    Pending,
    /// Run summarized and waiting on an explicit user decision.
    AwaitingConfirmation,
    /// Run actively processing items.
    Running,
    /// All items processed with at least one success.
    Completed,
    /// Run failed at run level (total failure or artifact write error).
    Failed,
    /// Run was rejected at the gate or cancelled while running.
    Cancelled,
}

impl RunState {
    /// Returns true if the run is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns true if the run is still active (not terminal).
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if `next` is a legal forward transition from this state.
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::AwaitingConfirmation)
                | (Self::AwaitingConfirmation, Self::Running)
                | (Self::AwaitingConfirmation, Self::Cancelled)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
                | (Self::Running, Self::Cancelled)
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{name}")
    }
}

/// Status of a single item within a Run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    /// The worker returned a payload matching the response format.
    Success,
    /// The invocation failed, timed out, or returned a mismatched payload.
    Failed,
}
