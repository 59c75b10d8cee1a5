//! Core domain errors.

use thiserror::Error;

/// Core domain errors for RepeatRun.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Task list resolved to zero items; it must not enter execution.
    #[error("Task list '{0}' has no items")]
    EmptyTaskList(String),

    /// Item identifier is blank or otherwise unusable.
    #[error("Invalid item: {0}")]
    InvalidItem(String),

    /// Instruction template is missing the item placeholder.
    #[error("Invalid instruction template: {0}")]
    InvalidTemplate(String),

    /// Response format declaration is unusable.
    #[error("Invalid response format: {0}")]
    InvalidResponseFormat(String),

    /// Invalid state transition.
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    /// An outcome was recorded twice for the same item position.
    #[error("Outcome already recorded for position {0}")]
    DuplicateOutcome(usize),

    /// An outcome referenced a position outside the task list.
    #[error("Outcome position {position} out of range (total {total})")]
    OutcomeOutOfRange { position: usize, total: usize },
}
