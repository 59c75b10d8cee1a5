//! The repetitive-task execution engine.
//!
//! Owns every Run: the registry maps run ids to handles, and all state
//! mutation happens here. The progress tracker only ever reads.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{RwLock, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use repeatrun_core::{
    FailureReason, Item, ItemOutcome, ResponseFormat, Run, RunId, RunInstruction, RunRequest,
    RunState,
};

use crate::aggregator::ResultAggregator;
use crate::config::RunnerConfig;
use crate::error::EngineError;
use crate::tracker::RunProgressTracker;
use crate::worker::{ItemWorker, WorkerError};

/// A registered run plus its cancellation token.
pub(crate) struct RunHandle {
    pub(crate) run: RwLock<Run>,
    pub(crate) cancel: CancellationToken,
}

/// Runs indexed by RunId, shared read-only with the tracker.
pub(crate) type RunRegistry = Arc<RwLock<HashMap<RunId, Arc<RunHandle>>>>;

/// Final report of a driven run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Run identity.
    pub run_id: RunId,
    /// Terminal state the run settled into.
    pub state: RunState,
    /// Total number of items.
    pub total: usize,
    /// Items processed successfully.
    pub succeeded: usize,
    /// Items processed with a failure.
    pub failed: usize,
    /// Path of the finalized artifact, when one was written.
    pub artifact_path: Option<PathBuf>,
}

impl RunReport {
    fn of(run: &Run) -> Self {
        Self {
            run_id: run.id.clone(),
            state: run.state,
            total: run.total(),
            succeeded: run.succeeded,
            failed: run.failed,
            artifact_path: run.artifact_path.clone(),
        }
    }
}

/// The execution engine: iterates items, invokes the worker per item,
/// tracks progress, and tolerates partial failures.
pub struct RepetitiveTaskRunner {
    runs: RunRegistry,
    worker: Arc<dyn ItemWorker>,
    aggregator: ResultAggregator,
    config: RunnerConfig,
}

impl RepetitiveTaskRunner {
    /// Create a new runner.
    pub fn new(
        worker: Arc<dyn ItemWorker>,
        aggregator: ResultAggregator,
        config: RunnerConfig,
    ) -> Self {
        Self {
            runs: Arc::new(RwLock::new(HashMap::new())),
            worker,
            aggregator,
            config,
        }
    }

    /// A read-only progress tracker over this runner's runs.
    pub fn tracker(&self) -> RunProgressTracker {
        RunProgressTracker::new(Arc::clone(&self.runs))
    }

    /// Register a run, leaving it awaiting confirmation.
    pub async fn submit(&self, request: RunRequest) -> Result<RunId, EngineError> {
        let mut run = Run::new(request);
        run.transition(RunState::AwaitingConfirmation)?;
        let run_id = run.id.clone();
        info!(
            run_id = %run_id,
            total = run.total(),
            artifact = %run.request.artifact_name,
            "Run submitted, awaiting confirmation"
        );

        let handle = Arc::new(RunHandle {
            run: RwLock::new(run),
            cancel: CancellationToken::new(),
        });
        self.runs.write().await.insert(run_id.clone(), handle);
        Ok(run_id)
    }

    /// Mark a run confirmed. Only a confirmed run can be executed.
    pub async fn confirm(&self, run_id: &RunId) -> Result<(), EngineError> {
        let handle = self.handle(run_id).await?;
        let mut run = handle.run.write().await;
        run.transition(RunState::Running)?;
        info!(run_id = %run_id, "Run confirmed");
        Ok(())
    }

    /// Reject a run at the gate.
    pub async fn reject(&self, run_id: &RunId) -> Result<(), EngineError> {
        let handle = self.handle(run_id).await?;
        let mut run = handle.run.write().await;
        run.transition(RunState::Cancelled)?;
        info!(run_id = %run_id, "Run rejected at the gate");
        Ok(())
    }

    /// Request cooperative cancellation.
    ///
    /// An unconfirmed run settles into Cancelled immediately; a running
    /// one stops before its next item, letting in-flight invocations
    /// finish and record their outcomes.
    pub async fn cancel(&self, run_id: &RunId) -> Result<(), EngineError> {
        let handle = self.handle(run_id).await?;
        {
            let mut run = handle.run.write().await;
            if run.state == RunState::AwaitingConfirmation {
                run.transition(RunState::Cancelled)?;
                info!(run_id = %run_id, "Run cancelled before confirmation");
                return Ok(());
            }
        }
        handle.cancel.cancel();
        info!(run_id = %run_id, "Run cancellation requested");
        Ok(())
    }

    /// Drive a confirmed run to a terminal state.
    ///
    /// Per-item failures are recorded and never abort the run. Run-level
    /// conditions (total failure, artifact write error) surface as errors
    /// with the partial outcome set still queryable via the tracker.
    pub async fn execute(&self, run_id: &RunId) -> Result<RunReport, EngineError> {
        let handle = self.handle(run_id).await?;
        let (items, instruction, format) = {
            let run = handle.run.read().await;
            if run.state != RunState::Running {
                return Err(EngineError::NotConfirmed(run_id.clone()));
            }
            (
                run.request.task_list.items.clone(),
                run.request.instruction.clone(),
                run.request.response_format.clone(),
            )
        };

        if self.config.max_concurrent_items > 1 {
            self.process_concurrent(&handle, &items, &instruction, &format)
                .await?;
        } else {
            self.process_sequential(&handle, &items, &instruction, &format)
                .await?;
        }
        self.settle(&handle).await
    }

    /// Re-run artifact finalization for a run whose outcomes are already
    /// recorded. Used to retry after an artifact write error.
    pub async fn finalize(&self, run_id: &RunId) -> Result<PathBuf, EngineError> {
        let handle = self.handle(run_id).await?;
        let path = {
            let run = handle.run.read().await;
            self.aggregator.finalize(&run)?
        };
        handle.run.write().await.artifact_path = Some(path.clone());
        Ok(path)
    }

    async fn handle(&self, run_id: &RunId) -> Result<Arc<RunHandle>, EngineError> {
        self.runs
            .read()
            .await
            .get(run_id)
            .cloned()
            .ok_or_else(|| EngineError::RunNotFound(run_id.clone()))
    }

    async fn process_sequential(
        &self,
        handle: &Arc<RunHandle>,
        items: &[Item],
        instruction: &RunInstruction,
        format: &ResponseFormat,
    ) -> Result<(), EngineError> {
        for (position, item) in items.iter().enumerate() {
            // Cooperative cancellation check between items.
            if handle.cancel.is_cancelled() {
                break;
            }
            let outcome = self.process_item(item, position, instruction, format).await;
            handle.run.write().await.record_outcome(outcome)?;
        }
        Ok(())
    }

    async fn process_concurrent(
        &self,
        handle: &Arc<RunHandle>,
        items: &[Item],
        instruction: &RunInstruction,
        format: &ResponseFormat,
    ) -> Result<(), EngineError> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_items));
        let mut in_flight = FuturesUnordered::new();

        for (position, item) in items.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let cancel = handle.cancel.clone();
            in_flight.push(async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return None;
                };
                // Items that have not started are skipped on cancellation;
                // in-flight invocations run to completion and record.
                if cancel.is_cancelled() {
                    return None;
                }
                Some(self.process_item(item, position, instruction, format).await)
            });
        }

        while let Some(completed) = in_flight.next().await {
            if let Some(outcome) = completed {
                // Counter updates are serialized behind the run lock.
                handle.run.write().await.record_outcome(outcome)?;
            }
        }
        Ok(())
    }

    async fn process_item(
        &self,
        item: &Item,
        position: usize,
        instruction: &RunInstruction,
        format: &ResponseFormat,
    ) -> ItemOutcome {
        let prompt = instruction.render(&item.name);
        let attempts = self.config.max_retries_per_item + 1;
        let mut failure = FailureReason::Worker("not attempted".to_string());

        for attempt in 1..=attempts {
            match self.invoke_once(&prompt, format).await {
                Ok(payload) => match format.validate(&payload) {
                    Ok(()) => {
                        debug!(item = %item.name, position, attempt, "Item succeeded");
                        return ItemOutcome::success(&item.name, position, payload);
                    }
                    Err(mismatch) => {
                        warn!(
                            item = %item.name,
                            position,
                            attempt,
                            error = %mismatch,
                            "Item payload mismatched the response format"
                        );
                        failure = FailureReason::SchemaMismatch(mismatch.to_string());
                    }
                },
                Err(reason) => {
                    warn!(
                        item = %item.name,
                        position,
                        attempt,
                        error = %reason,
                        "Item invocation failed"
                    );
                    failure = reason;
                }
            }
        }
        ItemOutcome::failed(&item.name, position, failure)
    }

    async fn invoke_once(
        &self,
        prompt: &str,
        format: &ResponseFormat,
    ) -> Result<HashMap<String, String>, FailureReason> {
        let worker_reason = |e: WorkerError| match e {
            WorkerError::Invocation(msg) => FailureReason::Worker(msg),
            WorkerError::MalformedReply(msg) => {
                FailureReason::Worker(format!("malformed reply: {msg}"))
            }
        };
        match self.config.item_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.worker.invoke(prompt, format))
                .await
            {
                Ok(result) => result.map_err(worker_reason),
                Err(_) => Err(FailureReason::Timeout),
            },
            None => self.worker.invoke(prompt, format).await.map_err(worker_reason),
        }
    }

    async fn settle(&self, handle: &Arc<RunHandle>) -> Result<RunReport, EngineError> {
        if handle.cancel.is_cancelled() {
            let mut run = handle.run.write().await;
            run.transition(RunState::Cancelled)?;
            info!(
                run_id = %run.id,
                completed = run.succeeded,
                failed = run.failed,
                remaining = run.remaining(),
                "Run cancelled"
            );
            return Ok(RunReport::of(&run));
        }

        let (succeeded, failed) = {
            let run = handle.run.read().await;
            (run.succeeded, run.failed)
        };
        if succeeded == 0 {
            let mut run = handle.run.write().await;
            run.fail(format!("all {failed} items failed"))?;
            warn!(run_id = %run.id, failed, "Run failed: zero successes");
            return Err(EngineError::TotalFailure { failed });
        }

        // Finalize before declaring completion, so an artifact write error
        // leaves the run Failed with outcomes intact for a finalize retry.
        let finalized = {
            let run = handle.run.read().await;
            self.aggregator.finalize(&run)
        };
        match finalized {
            Ok(path) => {
                let mut run = handle.run.write().await;
                run.artifact_path = Some(path);
                run.transition(RunState::Completed)?;
                info!(
                    run_id = %run.id,
                    completed = run.succeeded,
                    failed = run.failed,
                    "Run completed"
                );
                Ok(RunReport::of(&run))
            }
            Err(e) => {
                let mut run = handle.run.write().await;
                run.fail(e.to_string())?;
                warn!(run_id = %run.id, error = %e, "Run failed: artifact write error");
                Err(e)
            }
        }
    }
}
