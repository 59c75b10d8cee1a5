//! Command-backed item worker.
//!
//! Each invocation spawns the configured program with the rendered prompt
//! and the comma-joined response field names as its two arguments, and
//! expects a flat JSON object on stdout. This is the seam where an
//! agent-backed worker (or any other capability) plugs into the engine.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use repeatrun_core::ResponseFormat;
use repeatrun_engine::payload::extract_payload;
use repeatrun_engine::{ItemWorker, WorkerError};

/// Worker that shells out to an external program per item.
pub struct CommandWorker {
    program: String,
}

impl CommandWorker {
    /// Create a worker around the given program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl ItemWorker for CommandWorker {
    async fn invoke(
        &self,
        prompt: &str,
        format: &ResponseFormat,
    ) -> Result<HashMap<String, String>, WorkerError> {
        debug!(program = %self.program, prompt_len = prompt.len(), "Spawning item worker");

        let output = Command::new(&self.program)
            .arg(prompt)
            .arg(format.fields().join(","))
            .output()
            .await
            .map_err(|e| {
                WorkerError::Invocation(format!("failed to spawn '{}': {e}", self.program))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WorkerError::Invocation(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        extract_payload(&stdout)
    }
}
