//! Interactive confirmation gate over stdin.

use std::io::{self, Write};

use async_trait::async_trait;

use repeatrun_engine::{ConfirmationGate, Decision, Summary};

/// Presents the task list summary on stdout and reads the decision from
/// stdin: `y`/`yes` confirms, `n`/`no`/empty rejects, anything else is
/// treated as an amended task list query.
pub struct StdinGate;

#[async_trait]
impl ConfirmationGate for StdinGate {
    async fn await_decision(&self, summary: &Summary) -> Decision {
        println!(
            "Task list '{}' resolved with {} items:",
            summary.name, summary.total
        );
        for item in &summary.sample {
            println!("  - {item}");
        }
        if summary.total > summary.sample.len() {
            println!("  ... and {} more", summary.total - summary.sample.len());
        }
        print!("Proceed? [y/N, or type a different task list query]: ");
        let _ = io::stdout().flush();

        let line = tokio::task::spawn_blocking(|| {
            let mut buffer = String::new();
            io::stdin().read_line(&mut buffer).map(|_| buffer)
        })
        .await;

        let Ok(Ok(line)) = line else {
            return Decision::Rejected;
        };
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "y" | "yes" => Decision::Confirmed,
            "" | "n" | "no" => Decision::Rejected,
            _ => Decision::Amended(trimmed.to_string()),
        }
    }
}
