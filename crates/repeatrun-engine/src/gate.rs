//! The confirmation gate: no bulk execution before an explicit decision.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use repeatrun_core::TaskList;

/// Maximum number of sample items included in a summary.
pub const SAMPLE_SIZE: usize = 5;

/// Count-and-sample summary of a resolved task list, presented to the user
/// before bulk execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Name of the task list.
    pub name: String,
    /// Total item count.
    pub total: usize,
    /// Up to the first five item identifiers.
    pub sample: Vec<String>,
}

impl Summary {
    /// Summarize a task list.
    pub fn of(list: &TaskList) -> Self {
        Self {
            name: list.id.as_str().to_string(),
            total: list.len(),
            sample: list
                .item_names()
                .take(SAMPLE_SIZE)
                .map(str::to_string)
                .collect(),
        }
    }
}

/// The user's decision on a presented summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Proceed with bulk execution.
    Confirmed,
    /// Halt the workflow with no side effects.
    Rejected,
    /// Re-enter resolution with a refined query.
    Amended(String),
}

/// Synchronous checkpoint before bulk execution.
///
/// The engine imposes no timeout: the surrounding transport owns wait
/// semantics. The only contract is that no worker invocation happens
/// before `Confirmed` is observed.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    /// Present a summary and wait for the user's decision.
    async fn await_decision(&self, summary: &Summary) -> Decision;
}

/// Gate that confirms everything. For non-interactive callers that have
/// already obtained approval out of band.
pub struct AutoConfirm;

#[async_trait]
impl ConfirmationGate for AutoConfirm {
    async fn await_decision(&self, _summary: &Summary) -> Decision {
        Decision::Confirmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repeatrun_core::{Item, TaskListId, TaskListSource};

    fn list(names: &[&str]) -> TaskList {
        let items = names.iter().map(|n| Item::new(*n).unwrap()).collect();
        TaskList::new(
            TaskListId::new("test"),
            items,
            TaskListSource::ConstructedFromSource {
                source: "test".to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_summary_sample_capped_at_five() {
        let list = list(&["a", "b", "c", "d", "e", "f", "g"]);
        let summary = Summary::of(&list);

        assert_eq!(summary.total, 7);
        assert_eq!(summary.sample, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_summary_short_list() {
        let list = list(&["a", "b"]);
        let summary = Summary::of(&list);

        assert_eq!(summary.total, 2);
        assert_eq!(summary.sample, vec!["a", "b"]);
    }
}
