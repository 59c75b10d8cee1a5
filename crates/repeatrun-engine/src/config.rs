//! Engine and runner configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Data-directory layout for the engine.
///
/// Task lists live under `<data_dir>/task_lists`, finalized artifacts under
/// `<data_dir>/results`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root directory for stored task lists and result artifacts.
    pub data_dir: PathBuf,
}

impl EngineConfig {
    /// Create a config rooted at the given directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Directory holding stored task list CSVs.
    pub fn task_lists_dir(&self) -> PathBuf {
        self.data_dir.join("task_lists")
    }

    /// Directory holding finalized result artifacts.
    pub fn results_dir(&self) -> PathBuf {
        self.data_dir.join("results")
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

/// Execution knobs for the runner.
///
/// The defaults are the simplest correct design: strictly sequential, no
/// timeout, no retries. Timeout, retry count, and the concurrency cap are
/// explicit configuration, not guessed defaults.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Maximum worker invocations in flight. 1 means sequential.
    pub max_concurrent_items: usize,

    /// Timeout applied to each worker invocation. None means unbounded.
    pub item_timeout: Option<Duration>,

    /// Extra attempts per item after a failed invocation.
    pub max_retries_per_item: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_items: 1,
            item_timeout: None,
            max_retries_per_item: 0,
        }
    }
}
