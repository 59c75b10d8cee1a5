//! Workflow glue: resolve, gate, then run.

use std::sync::Arc;

use tracing::info;

use repeatrun_core::{ResponseFormat, RunId, RunInstruction, RunRequest};

use crate::error::EngineError;
use crate::gate::{ConfirmationGate, Decision, Summary};
use crate::resolver::TaskListResolver;
use crate::runner::{RepetitiveTaskRunner, RunReport};

/// Wires resolver, gate, and runner into the resolve/confirm/execute
/// workflow. The engine's public entry point for callers that do not need
/// to drive the pieces individually.
pub struct Orchestrator {
    resolver: TaskListResolver,
    runner: Arc<RepetitiveTaskRunner>,
}

impl Orchestrator {
    /// Create a new Orchestrator.
    pub fn new(resolver: TaskListResolver, runner: Arc<RepetitiveTaskRunner>) -> Self {
        Self { resolver, runner }
    }

    /// The underlying runner, for progress tracking and cancellation.
    pub fn runner(&self) -> &Arc<RepetitiveTaskRunner> {
        &self.runner
    }

    /// Resolve a query, present the summary at the gate, and submit a
    /// confirmed run. Loops on `Amended` decisions, re-entering the
    /// resolver with each refined query.
    ///
    /// Returns the id of a run already transitioned to Running. A
    /// rejection cancels the pending run and surfaces `NotConfirmed`.
    pub async fn prepare(
        &self,
        query: &str,
        instruction: &RunInstruction,
        format: &ResponseFormat,
        artifact_name: &str,
        gate: &dyn ConfirmationGate,
    ) -> Result<RunId, EngineError> {
        let mut query = query.to_string();
        loop {
            let list = self.resolver.resolve(&query).await?;
            let summary = Summary::of(&list);
            let request =
                RunRequest::new(list, instruction.clone(), format.clone(), artifact_name);
            let run_id = self.runner.submit(request).await?;

            match gate.await_decision(&summary).await {
                Decision::Confirmed => {
                    self.runner.confirm(&run_id).await?;
                    return Ok(run_id);
                }
                Decision::Rejected => {
                    self.runner.reject(&run_id).await?;
                    return Err(EngineError::NotConfirmed(run_id));
                }
                Decision::Amended(refined) => {
                    info!(run_id = %run_id, refined = %refined, "Summary amended, re-resolving");
                    self.runner.reject(&run_id).await?;
                    query = refined;
                }
            }
        }
    }

    /// Full workflow: prepare, then drive the run to a terminal state.
    pub async fn execute_query(
        &self,
        query: &str,
        instruction: &RunInstruction,
        format: &ResponseFormat,
        artifact_name: &str,
        gate: &dyn ConfirmationGate,
    ) -> Result<RunReport, EngineError> {
        let run_id = self
            .prepare(query, instruction, format, artifact_name, gate)
            .await?;
        self.runner.execute(&run_id).await
    }
}
