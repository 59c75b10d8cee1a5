//! Run and per-item outcome types.

use crate::{
    CoreError, ItemStatus, ResponseFormat, RunId, RunInstruction, RunState, TaskList,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Binds a TaskList + RunInstruction + response contract + output artifact
/// name. Created once confirmation succeeds; triggers exactly one Run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    /// The confirmed task list to iterate over.
    pub task_list: TaskList,

    /// Per-item instruction template.
    pub instruction: RunInstruction,

    /// Fields every successful item payload must carry.
    pub response_format: ResponseFormat,

    /// Base name (without extension) of the output artifact.
    pub artifact_name: String,
}

impl RunRequest {
    /// Create a new RunRequest.
    pub fn new(
        task_list: TaskList,
        instruction: RunInstruction,
        response_format: ResponseFormat,
        artifact_name: impl Into<String>,
    ) -> Self {
        Self {
            task_list,
            instruction,
            response_format,
            artifact_name: artifact_name.into(),
        }
    }
}

/// Why a single item failed. Per-item failures are recorded, never escalated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The worker invocation itself failed.
    Worker(String),
    /// The worker invocation exceeded the configured timeout.
    Timeout,
    /// The returned payload did not match the declared response format.
    SchemaMismatch(String),
    /// The item never started because the run was cancelled.
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Worker(msg) => write!(f, "worker error: {msg}"),
            Self::Timeout => write!(f, "timeout"),
            Self::SchemaMismatch(detail) => write!(f, "schema mismatch: {detail}"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Recorded result for one item within a Run.
///
/// Created once per item, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOutcome {
    /// The item identifier.
    pub item: String,

    /// Zero-indexed position in the task list.
    pub position: usize,

    /// Success or Failed.
    pub status: ItemStatus,

    /// Declared response fields to values. Empty on failure.
    pub payload: HashMap<String, String>,

    /// Failure reason when status is Failed.
    pub failure: Option<FailureReason>,
}

impl ItemOutcome {
    /// Create a successful outcome.
    pub fn success(
        item: impl Into<String>,
        position: usize,
        payload: HashMap<String, String>,
    ) -> Self {
        Self {
            item: item.into(),
            position,
            status: ItemStatus::Success,
            payload,
            failure: None,
        }
    }

    /// Create a failed outcome.
    pub fn failed(item: impl Into<String>, position: usize, reason: FailureReason) -> Self {
        Self {
            item: item.into(),
            position,
            status: ItemStatus::Failed,
            payload: HashMap::new(),
            failure: Some(reason),
        }
    }

    /// Whether this outcome is a success.
    pub fn is_success(&self) -> bool {
        self.status == ItemStatus::Success
    }
}

/// Read-only snapshot of a Run's progress at query time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Run identity.
    pub run_id: RunId,
    /// Run state at snapshot time.
    pub state: RunState,
    /// Total number of items.
    pub total: usize,
    /// Items processed successfully.
    pub completed: usize,
    /// Items processed with a failure.
    pub failed: usize,
    /// Items not yet processed.
    pub remaining: usize,
    /// Identifier of the most recently processed item.
    pub last_item: Option<String>,
    /// Seconds since the run started, zero if it never started.
    pub elapsed_seconds: i64,
}

/// One execution of the orchestration engine over a confirmed task list.
///
/// Owned exclusively by the runner; mutated only by it, monotonically.
/// The progress tracker holds a read-only view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Unique run identifier.
    pub id: RunId,

    /// The request that triggered this run.
    pub request: RunRequest,

    /// Current state.
    pub state: RunState,

    /// Per-item outcomes, indexed by item position. `None` until processed.
    pub outcomes: Vec<Option<ItemOutcome>>,

    /// Items processed successfully.
    pub succeeded: usize,

    /// Items processed with a failure.
    pub failed: usize,

    /// Most recently processed item.
    pub last_item: Option<String>,

    /// When the run was created.
    pub created_at: DateTime<Utc>,

    /// When the run entered Running.
    pub started_at: Option<DateTime<Utc>>,

    /// When the run reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,

    /// Path of the finalized artifact, once written.
    pub artifact_path: Option<PathBuf>,

    /// Run-level failure message, when state is Failed.
    pub error_message: Option<String>,
}

impl Run {
    /// Create a new Run in Pending state.
    pub fn new(request: RunRequest) -> Self {
        let total = request.task_list.len();
        Self {
            id: RunId::generate(),
            request,
            state: RunState::Pending,
            outcomes: vec![None; total],
            succeeded: 0,
            failed: 0,
            last_item: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            artifact_path: None,
            error_message: None,
        }
    }

    /// Total number of items.
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Items not yet processed.
    pub fn remaining(&self) -> usize {
        self.total() - self.succeeded - self.failed
    }

    /// Transition to a new state, enforcing forward-only moves.
    ///
    /// Sets `started_at` on entering Running and `finished_at` on reaching
    /// a terminal state.
    pub fn transition(&mut self, next: RunState) -> Result<(), CoreError> {
        if !self.state.can_transition_to(next) {
            return Err(CoreError::InvalidStateTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        if next == RunState::Running {
            self.started_at = Some(Utc::now());
        }
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Transition to Failed, recording the run-level error message.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), CoreError> {
        self.transition(RunState::Failed)?;
        self.error_message = Some(message.into());
        Ok(())
    }

    /// Record the outcome for one item and update counters.
    ///
    /// Each position accepts exactly one outcome.
    pub fn record_outcome(&mut self, outcome: ItemOutcome) -> Result<(), CoreError> {
        let position = outcome.position;
        let total = self.total();
        let slot = self
            .outcomes
            .get_mut(position)
            .ok_or(CoreError::OutcomeOutOfRange { position, total })?;
        if slot.is_some() {
            return Err(CoreError::DuplicateOutcome(position));
        }

        match outcome.status {
            ItemStatus::Success => self.succeeded += 1,
            ItemStatus::Failed => self.failed += 1,
        }
        self.last_item = Some(outcome.item.clone());
        *slot = Some(outcome);
        Ok(())
    }

    /// Build a progress snapshot of the run's current state.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let elapsed_seconds = match self.started_at {
            Some(start) => {
                let end = self.finished_at.unwrap_or_else(Utc::now);
                (end - start).num_seconds()
            }
            None => 0,
        };
        ProgressSnapshot {
            run_id: self.id.clone(),
            state: self.state,
            total: self.total(),
            completed: self.succeeded,
            failed: self.failed,
            remaining: self.remaining(),
            last_item: self.last_item.clone(),
            elapsed_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Item, TaskListId, TaskListSource};

    fn request(names: &[&str]) -> RunRequest {
        let items = names.iter().map(|n| Item::new(*n).unwrap()).collect();
        let task_list = TaskList::new(
            TaskListId::new("test"),
            items,
            TaskListSource::ConstructedFromSource {
                source: "test".to_string(),
            },
        )
        .unwrap();
        RunRequest::new(
            task_list,
            RunInstruction::new("Process {item}").unwrap(),
            ResponseFormat::new(vec!["value".to_string()]).unwrap(),
            "out",
        )
    }

    fn payload(value: &str) -> HashMap<String, String> {
        HashMap::from([("value".to_string(), value.to_string())])
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut run = Run::new(request(&["a", "b"]));
        assert_eq!(run.state, RunState::Pending);

        run.transition(RunState::AwaitingConfirmation).unwrap();
        run.transition(RunState::Running).unwrap();
        assert!(run.started_at.is_some());

        run.transition(RunState::Completed).unwrap();
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_backward_transition_rejected() {
        let mut run = Run::new(request(&["a"]));
        run.transition(RunState::AwaitingConfirmation).unwrap();
        run.transition(RunState::Running).unwrap();

        let err = run.transition(RunState::AwaitingConfirmation).unwrap_err();
        assert!(matches!(err, CoreError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_record_outcome_counters() {
        let mut run = Run::new(request(&["a", "b", "c"]));
        run.record_outcome(ItemOutcome::success("a", 0, payload("1")))
            .unwrap();
        run.record_outcome(ItemOutcome::failed(
            "b",
            1,
            FailureReason::Worker("boom".to_string()),
        ))
        .unwrap();

        assert_eq!(run.succeeded, 1);
        assert_eq!(run.failed, 1);
        assert_eq!(run.remaining(), 1);
        assert_eq!(run.last_item.as_deref(), Some("b"));
    }

    #[test]
    fn test_duplicate_outcome_rejected() {
        let mut run = Run::new(request(&["a"]));
        run.record_outcome(ItemOutcome::success("a", 0, payload("1")))
            .unwrap();

        let err = run
            .record_outcome(ItemOutcome::success("a", 0, payload("2")))
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateOutcome(0)));
    }

    #[test]
    fn test_outcome_out_of_range() {
        let mut run = Run::new(request(&["a"]));
        let err = run
            .record_outcome(ItemOutcome::success("b", 5, payload("1")))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::OutcomeOutOfRange { position: 5, total: 1 }
        ));
    }

    #[test]
    fn test_snapshot_counts() {
        let mut run = Run::new(request(&["a", "b", "c"]));
        run.transition(RunState::AwaitingConfirmation).unwrap();
        run.transition(RunState::Running).unwrap();
        run.record_outcome(ItemOutcome::success("a", 0, payload("1")))
            .unwrap();

        let snap = run.snapshot();
        assert_eq!(snap.state, RunState::Running);
        assert_eq!(snap.total, 3);
        assert_eq!(snap.completed, 1);
        assert_eq!(snap.failed, 0);
        assert_eq!(snap.remaining, 2);
        assert_eq!(snap.last_item.as_deref(), Some("a"));
    }

    #[test]
    fn test_failure_reason_display() {
        assert_eq!(
            FailureReason::Worker("no response".to_string()).to_string(),
            "worker error: no response"
        );
        assert_eq!(FailureReason::Timeout.to_string(), "timeout");
        assert_eq!(FailureReason::Cancelled.to_string(), "cancelled");
    }
}
