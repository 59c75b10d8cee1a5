//! Engine-level operational errors.
//!
//! Per-item failures never appear here: they are swallowed into
//! `ItemOutcome`s and recorded, not propagated. These variants cover
//! run-level and store-level conditions surfaced to the caller.

use repeatrun_core::{CoreError, RunId};
use std::path::PathBuf;
use thiserror::Error;

/// Engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No stored task list matches and none is constructable.
    #[error("Task list not found: {0}")]
    TaskListNotFound(String),

    /// A task list with this name already exists in the store.
    #[error("Task list already exists: {0}")]
    TaskListExists(String),

    /// The external item source failed while constructing a list.
    #[error("Item source failed for '{query}': {source}")]
    Source {
        query: String,
        #[source]
        source: crate::resolver::SourceError,
    },

    /// Run not found.
    #[error("Run not found: {0}")]
    RunNotFound(RunId),

    /// The run was rejected at the confirmation gate.
    #[error("Run {0} was not confirmed")]
    NotConfirmed(RunId),

    /// Zero successes across all items: run-level total failure.
    #[error("All {failed} items failed")]
    TotalFailure { failed: usize },

    /// The aggregated artifact could not be written.
    #[error("Failed to write artifact '{path}'")]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A task list file could not be read or parsed.
    #[error("Failed to read task list '{path}'")]
    StoreRead {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A task list file could not be written.
    #[error("Failed to write task list '{path}'")]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Domain invariant violation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Filesystem error outside CSV parsing.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
