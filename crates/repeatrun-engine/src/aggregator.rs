//! Result aggregation: per-item outcomes into a single tabular artifact.

use std::fs;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use tracing::info;

use repeatrun_core::{FailureReason, ItemStatus, Run};

use crate::error::EngineError;
use crate::store::sanitize_name;

/// Status column value for a successful row.
const STATUS_SUCCESS: &str = "success";

/// Collects per-item results in item order and persists them as a single
/// CSV artifact.
pub struct ResultAggregator {
    results_dir: PathBuf,
}

impl ResultAggregator {
    /// Create an aggregator writing into the given directory.
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
        }
    }

    /// Path the artifact for this name is written to.
    pub fn artifact_path(&self, artifact_name: &str) -> PathBuf {
        self.results_dir
            .join(format!("{}.csv", sanitize_name(artifact_name)))
    }

    /// Build and persist the artifact for a run.
    ///
    /// Rows follow task-list item order, never completion order: one row
    /// per item whether Success or Failed, so row count always equals the
    /// item count. Items without a recorded outcome (possible only when
    /// the run was cancelled before reaching them) are emitted as failed
    /// rows with a `cancelled` reason. Replaces any prior artifact of the
    /// same name; calling twice on the same run produces byte-identical
    /// output.
    pub fn finalize(&self, run: &Run) -> Result<PathBuf, EngineError> {
        let path = self.artifact_path(&run.request.artifact_name);
        let artifact_err = |source| EngineError::ArtifactWrite {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.results_dir)
            .map_err(|e| artifact_err(csv::Error::from(e)))?;
        self.write_rows(&path, run).map_err(artifact_err)?;

        info!(
            run_id = %run.id,
            path = %path.display(),
            rows = run.total(),
            "Finalized result artifact"
        );
        Ok(path)
    }

    fn write_rows(&self, path: &Path, run: &Run) -> Result<(), csv::Error> {
        let fields = run.request.response_format.fields();
        let mut writer = WriterBuilder::new().from_path(path)?;

        let mut header = vec!["item".to_string()];
        header.extend(fields.iter().cloned());
        header.push("status".to_string());
        writer.write_record(&header)?;

        for (position, item) in run.request.task_list.items.iter().enumerate() {
            let mut row = vec![item.name.clone()];
            match &run.outcomes[position] {
                Some(outcome) if outcome.status == ItemStatus::Success => {
                    for field in fields {
                        row.push(outcome.payload.get(field).cloned().unwrap_or_default());
                    }
                    row.push(STATUS_SUCCESS.to_string());
                }
                Some(outcome) => {
                    row.extend(fields.iter().map(|_| String::new()));
                    let reason = outcome
                        .failure
                        .clone()
                        .unwrap_or(FailureReason::Worker("unknown".to_string()));
                    row.push(format!("failed: {reason}"));
                }
                None => {
                    row.extend(fields.iter().map(|_| String::new()));
                    row.push(format!("failed: {}", FailureReason::Cancelled));
                }
            }
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repeatrun_core::{
        Item, ItemOutcome, ResponseFormat, Run, RunInstruction, RunRequest, TaskList,
        TaskListId, TaskListSource,
    };
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn run(names: &[&str]) -> Run {
        let items = names.iter().map(|n| Item::new(*n).unwrap()).collect();
        let task_list = TaskList::new(
            TaskListId::new("test"),
            items,
            TaskListSource::ConstructedFromSource {
                source: "test".to_string(),
            },
        )
        .unwrap();
        Run::new(RunRequest::new(
            task_list,
            RunInstruction::new("Find the official website for {item}").unwrap(),
            ResponseFormat::new(vec!["county".to_string(), "official_website".to_string()])
                .unwrap(),
            "md-sites",
        ))
    }

    fn success_payload(county: &str, site: &str) -> HashMap<String, String> {
        HashMap::from([
            ("county".to_string(), county.to_string()),
            ("official_website".to_string(), site.to_string()),
        ])
    }

    #[test]
    fn test_one_row_per_item_in_order() {
        let mut run = run(&["Allegany", "Anne Arundel", "Baltimore"]);
        // Record out of completion order; rows must still follow list order.
        run.record_outcome(ItemOutcome::success(
            "Baltimore",
            2,
            success_payload("Baltimore", "https://baltimore.example"),
        ))
        .unwrap();
        run.record_outcome(ItemOutcome::failed(
            "Anne Arundel",
            1,
            FailureReason::Worker("no response".to_string()),
        ))
        .unwrap();
        run.record_outcome(ItemOutcome::success(
            "Allegany",
            0,
            success_payload("Allegany", "https://allegany.example"),
        ))
        .unwrap();

        let dir = TempDir::new().unwrap();
        let aggregator = ResultAggregator::new(dir.path().join("results"));
        let path = aggregator.finalize(&run).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "item,county,official_website,status");
        assert!(lines[1].starts_with("Allegany,"));
        assert!(lines[1].ends_with(",success"));
        assert!(lines[2].starts_with("Anne Arundel,,,"));
        assert!(lines[2].contains("failed: worker error"));
        assert!(lines[3].starts_with("Baltimore,"));
    }

    #[test]
    fn test_finalize_idempotent() {
        let mut run = run(&["Allegany"]);
        run.record_outcome(ItemOutcome::success(
            "Allegany",
            0,
            success_payload("Allegany", "https://allegany.example"),
        ))
        .unwrap();

        let dir = TempDir::new().unwrap();
        let aggregator = ResultAggregator::new(dir.path().join("results"));
        let path = aggregator.finalize(&run).unwrap();
        let first = fs::read(&path).unwrap();
        let path2 = aggregator.finalize(&run).unwrap();
        let second = fs::read(&path2).unwrap();

        assert_eq!(path, path2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_outcomes_emitted_as_cancelled() {
        let mut run = run(&["Allegany", "Anne Arundel", "Baltimore"]);
        run.record_outcome(ItemOutcome::success(
            "Allegany",
            0,
            success_payload("Allegany", "https://allegany.example"),
        ))
        .unwrap();

        let dir = TempDir::new().unwrap();
        let aggregator = ResultAggregator::new(dir.path().join("results"));
        let path = aggregator.finalize(&run).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].ends_with("failed: cancelled"));
        assert!(lines[3].ends_with("failed: cancelled"));
    }

    #[test]
    fn test_prior_artifact_replaced() {
        let dir = TempDir::new().unwrap();
        let aggregator = ResultAggregator::new(dir.path().join("results"));

        let mut first = run(&["Allegany"]);
        first
            .record_outcome(ItemOutcome::failed(
                "Allegany",
                0,
                FailureReason::Timeout,
            ))
            .unwrap();
        let path = aggregator.finalize(&first).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("failed: timeout"));

        let mut second = run(&["Allegany"]);
        second
            .record_outcome(ItemOutcome::success(
                "Allegany",
                0,
                success_payload("Allegany", "https://allegany.example"),
            ))
            .unwrap();
        let path = aggregator.finalize(&second).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("success"));
    }
}
