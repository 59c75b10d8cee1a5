//! Read-only progress queries over the runner's runs.

use repeatrun_core::{ProgressSnapshot, RunId};

use crate::error::EngineError;
use crate::runner::RunRegistry;

/// Process-wide view of run progress, queryable at any time.
///
/// Holds a read-only reference to the runner's registry; querying never
/// blocks the runner beyond a brief read lock.
#[derive(Clone)]
pub struct RunProgressTracker {
    runs: RunRegistry,
}

impl RunProgressTracker {
    pub(crate) fn new(runs: RunRegistry) -> Self {
        Self { runs }
    }

    /// Snapshot a run's progress at call time.
    pub async fn status(&self, run_id: &RunId) -> Result<ProgressSnapshot, EngineError> {
        let handle = self
            .runs
            .read()
            .await
            .get(run_id)
            .cloned()
            .ok_or_else(|| EngineError::RunNotFound(run_id.clone()))?;
        let run = handle.run.read().await;
        Ok(run.snapshot())
    }
}
