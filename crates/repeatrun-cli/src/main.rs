//! RepeatRun CLI - orchestrate a repetitive task across a task list.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use repeatrun_core::{CoreError, ResponseFormat, RunInstruction};
use repeatrun_engine::{
    AutoConfirm, ConfirmationGate, EngineConfig, EngineError, Orchestrator,
    RepetitiveTaskRunner, ResultAggregator, RunnerConfig, Summary, TaskListResolver,
    TaskListStore,
};

mod gate;
mod worker;

use gate::StdinGate;
use worker::CommandWorker;

/// RepeatRun CLI - repetitive task orchestration
#[derive(Parser)]
#[command(name = "repeatrun")]
#[command(about = "Run a repetitive task over a stored task list", long_about = None)]
struct Cli {
    /// Data directory holding task lists and result artifacts
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored task lists
    Lists,

    /// Import a CSV file as a new task list
    Import {
        /// CSV file to import (header row, first column is the item)
        file: PathBuf,

        /// Name to store the task list under
        #[arg(short, long)]
        name: String,
    },

    /// Summarize a stored task list
    Show {
        /// Task list name
        name: String,
    },

    /// Resolve, confirm, and execute a run
    Run(RunArgs),

    /// Print the path of a finalized result artifact
    Artifact {
        /// Artifact base name used when the run was started
        name: String,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Task list name/query to resolve
    #[arg(short, long)]
    list: String,

    /// Instruction template containing the '{item}' placeholder
    #[arg(short, long)]
    instruction: String,

    /// Comma-separated response field names
    #[arg(short, long)]
    fields: String,

    /// Base name of the output artifact
    #[arg(short, long)]
    output: String,

    /// Worker program invoked per item (args: prompt, field names)
    #[arg(short, long)]
    worker: String,

    /// Skip the confirmation prompt
    #[arg(long)]
    yes: bool,

    /// Maximum worker invocations in flight
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Per-item timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Extra attempts per failed item
    #[arg(long, default_value_t = 0)]
    retries: u32,
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = EngineConfig::new(cli.data_dir);

    let result = match cli.command {
        Commands::Lists => cmd_lists(&config),
        Commands::Import { file, name } => cmd_import(&config, &file, &name),
        Commands::Show { name } => cmd_show(&config, &name),
        Commands::Run(args) => cmd_run(&config, args).await,
        Commands::Artifact { name } => cmd_artifact(&config, &name),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Map engine errors to the documented exit codes.
fn exit_code(error: &EngineError) -> u8 {
    match error {
        EngineError::TaskListNotFound(_) | EngineError::Source { .. } => 2,
        EngineError::Core(CoreError::EmptyTaskList(_)) => 3,
        EngineError::NotConfirmed(_) => 4,
        EngineError::TotalFailure { .. } => 5,
        _ => 1,
    }
}

fn cmd_lists(config: &EngineConfig) -> Result<(), EngineError> {
    let store = TaskListStore::new(config.task_lists_dir())?;
    let names = store.list()?;

    println!("Task lists ({}):", names.len());
    println!("{:<32}  {}", "NAME", "ITEMS");
    println!("{}", "-".repeat(42));
    for name in names {
        let count = store.load(&name).map(|list| list.len()).unwrap_or(0);
        println!("{:<32}  {}", name, count);
    }
    Ok(())
}

fn cmd_import(config: &EngineConfig, file: &PathBuf, name: &str) -> Result<(), EngineError> {
    let store = TaskListStore::new(config.task_lists_dir())?;
    let list = store.import(file, name)?;

    println!("Imported task list '{}' ({} items)", list.id, list.len());
    Ok(())
}

fn cmd_show(config: &EngineConfig, name: &str) -> Result<(), EngineError> {
    let store = TaskListStore::new(config.task_lists_dir())?;
    let list = store.load(name)?;
    let summary = Summary::of(&list);

    println!("Task list '{}': {} items", summary.name, summary.total);
    for item in &summary.sample {
        println!("  - {item}");
    }
    if summary.total > summary.sample.len() {
        println!("  ... and {} more", summary.total - summary.sample.len());
    }
    Ok(())
}

fn cmd_artifact(config: &EngineConfig, name: &str) -> Result<(), EngineError> {
    let aggregator = ResultAggregator::new(config.results_dir());
    let path = aggregator.artifact_path(name);
    if !path.is_file() {
        return Err(EngineError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no artifact named '{name}'"),
        )));
    }
    println!("{}", path.display());
    Ok(())
}

async fn cmd_run(config: &EngineConfig, args: RunArgs) -> Result<(), EngineError> {
    let instruction = RunInstruction::new(&args.instruction)?;
    let fields: Vec<String> = args
        .fields
        .split(',')
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect();
    let format = ResponseFormat::new(fields)?;

    let store = Arc::new(TaskListStore::new(config.task_lists_dir())?);
    let resolver = TaskListResolver::new(store);
    let runner = Arc::new(RepetitiveTaskRunner::new(
        Arc::new(CommandWorker::new(args.worker)),
        ResultAggregator::new(config.results_dir()),
        RunnerConfig {
            max_concurrent_items: args.concurrency.max(1),
            item_timeout: args.timeout_secs.map(Duration::from_secs),
            max_retries_per_item: args.retries,
        },
    ));
    let orchestrator = Orchestrator::new(resolver, Arc::clone(&runner));

    let gate: Box<dyn ConfirmationGate> = if args.yes {
        Box::new(AutoConfirm)
    } else {
        Box::new(StdinGate)
    };
    let run_id = orchestrator
        .prepare(&args.list, &instruction, &format, &args.output, gate.as_ref())
        .await?;
    println!("Run {run_id} started");

    let exec_runner = Arc::clone(&runner);
    let exec_id = run_id.clone();
    let execution = tokio::spawn(async move { exec_runner.execute(&exec_id).await });

    // Pull-style progress while the run executes.
    let tracker = runner.tracker();
    while !execution.is_finished() {
        tokio::time::sleep(Duration::from_millis(500)).await;
        if let Ok(snapshot) = tracker.status(&run_id).await {
            println!(
                "  {}/{} processed, {} failed, {}s elapsed",
                snapshot.completed + snapshot.failed,
                snapshot.total,
                snapshot.failed,
                snapshot.elapsed_seconds
            );
            if snapshot.state.is_terminal() {
                break;
            }
        }
    }

    let report = execution
        .await
        .map_err(|e| EngineError::Io(std::io::Error::other(e)))??;

    println!("Run {} {}:", report.run_id, report.state);
    println!("  Total:      {}", report.total);
    println!("  Succeeded:  {}", report.succeeded);
    println!("  Failed:     {}", report.failed);
    if let Some(path) = &report.artifact_path {
        println!("  Artifact:   {}", path.display());
    }
    Ok(())
}
