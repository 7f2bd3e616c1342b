// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `delta run` - drive the engine loop for one invocation.

use crate::exit_error::{ExitError, EXIT_INTERRUPTED, EXIT_WAITING_FOR_INPUT};
use anyhow::{Context, Result};
use delta_adapters::{LlmAdapter, ReplayAdapter};
use delta_core::RunStatus;
use delta_engine::{Engine, EngineOptions, LoopOutcome};
use delta_journal::{create_run, resume_run, RunPaths, WorkspaceLayout, WorkspaceLock};
use std::path::PathBuf;
use tracing::info;

#[derive(clap::Args)]
pub struct RunArgs {
    /// Agent directory (contains agent.yaml)
    #[arg(long)]
    pub agent: PathBuf,

    /// Initial task for the agent
    #[arg(long)]
    pub task: Option<String>,

    /// Workspace directory (default: current directory)
    #[arg(long = "work-dir")]
    pub work_dir: Option<PathBuf>,

    /// Answer ask_human on the terminal instead of parking the run
    #[arg(short = 'i', long)]
    pub interactive: bool,

    /// Auto-answer confirmation prompts
    #[arg(short = 'y')]
    pub assume_yes: bool,

    /// Resume the most recent run of this workspace
    #[arg(long)]
    pub resume: bool,

    /// Override the agent's iteration cap
    #[arg(long = "max-iterations")]
    pub max_iterations: Option<u32>,
}

pub async fn execute(args: RunArgs) -> Result<()> {
    let agent = delta_config::load_agent(&args.agent)
        .with_context(|| format!("loading agent from {}", args.agent.display()))?;

    let work_dir = match args.work_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    std::fs::create_dir_all(&work_dir)?;
    let layout = WorkspaceLayout::new(std::fs::canonicalize(&work_dir)?);

    // One engine loop per workspace; held for the whole invocation.
    let _lock = WorkspaceLock::acquire(&layout)?;

    let run = if args.resume {
        resume_run(&layout)?
    } else {
        create_run(&layout, &agent.agent_dir, &agent.config_hash)?
    };

    let _log_guard = setup_run_logging(run.paths())?;
    info!(run_id = %run.run_id(), agent = %agent.config.name, "engine invocation starting");

    let llm = build_llm_adapter()?;
    let options = EngineOptions {
        task: args.task,
        interactive: args.interactive,
        assume_yes: args.assume_yes,
        max_iterations: args.max_iterations,
    };

    let handle = run.clone();
    let response_path = handle.paths().interaction_response_path();
    let mut engine = Engine::new(agent, layout, run, llm, options)?;

    tokio::select! {
        result = engine.run() => {
            match result? {
                LoopOutcome::Completed => {
                    println!("run {} completed", handle.run_id());
                    Ok(())
                }
                LoopOutcome::WaitingForInput => Err(ExitError::new(
                    EXIT_WAITING_FOR_INPUT,
                    format!(
                        "run is waiting for input; write the answer to {} and re-run with --resume",
                        response_path.display()
                    ),
                )
                .into()),
                LoopOutcome::Failed(reason) => {
                    Err(ExitError::new(1, format!("run failed: {}", reason)).into())
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            // Sessions keep running; only this run's status changes. Journal
            // appends are synchronous, so nothing is in flight to flush.
            if let Ok(meta) = handle.read_metadata() {
                if meta.status == RunStatus::Running {
                    let _ = handle.set_status(RunStatus::Interrupted);
                }
            }
            Err(ExitError::new(EXIT_INTERRUPTED, "interrupted").into())
        }
    }
}

/// Select the LLM transport from `DELTA_LLM`.
///
/// `replay:<script.jsonl>` serves canned responses; real transports
/// implement the same adapter trait out of tree.
fn build_llm_adapter() -> Result<Box<dyn LlmAdapter>> {
    let spec = std::env::var("DELTA_LLM").unwrap_or_default();

    if let Some(path) = spec.strip_prefix("replay:") {
        let adapter = ReplayAdapter::load(std::path::Path::new(path))?;
        return Ok(Box::new(adapter));
    }

    anyhow::bail!(
        "no LLM transport configured; set DELTA_LLM=replay:<script.jsonl> \
         or link a transport adapter"
    )
}

/// Per-run log file (`engine.log` in the run directory).
fn setup_run_logging(
    paths: &RunPaths,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    std::fs::create_dir_all(paths.dir())?;
    let file_appender = tracing_appender::rolling::never(paths.dir(), "engine.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}
