//! RepeatRun Orchestration Engine
//!
//! Drives a repetitive task over a bounded task list: resolve the list,
//! gate bulk execution behind explicit confirmation, invoke a worker per
//! item with partial-failure tolerance, and aggregate the outcomes into a
//! single tabular artifact.
//!
//! The worker capability, the external item source, and the confirmation
//! transport are collaborators behind async traits; the engine owns the
//! state machine, progress tracking, and aggregation.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod gate;
pub mod orchestrator;
pub mod payload;
pub mod resolver;
pub mod runner;
pub mod store;
pub mod tracker;
pub mod worker;

// Re-export commonly used types
pub use aggregator::ResultAggregator;
pub use config::{EngineConfig, RunnerConfig};
pub use error::EngineError;
pub use gate::{AutoConfirm, ConfirmationGate, Decision, Summary};
pub use orchestrator::Orchestrator;
pub use resolver::{ItemSource, SourceError, TaskListResolver};
pub use runner::{RepetitiveTaskRunner, RunReport};
pub use store::TaskListStore;
pub use tracker::RunProgressTracker;
pub use worker::{ItemWorker, WorkerError};
