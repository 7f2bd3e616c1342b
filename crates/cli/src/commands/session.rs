// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `delta session` - manage persistent interactive sessions.
//!
//! Sessions are held by detached holder daemons, so every subcommand works
//! from a fresh CLI process: resolve the session id through the workspace's
//! `.sessions/` metadata and talk to the holder's socket.

use crate::exit_error::ExitError;
use anyhow::Result;
use delta_core::SessionId;
use delta_journal::WorkspaceLayout;
use delta_sessions::SessionManager;
use std::path::PathBuf;

#[derive(clap::Args)]
pub struct SessionArgs {
    /// Workspace directory (default: current directory)
    #[arg(long = "work-dir", global = true)]
    pub work_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: SessionCommands,
}

#[derive(clap::Subcommand)]
pub enum SessionCommands {
    /// Start a session and print its id
    Start {
        /// Program to run (e.g. bash)
        command: String,
        /// Arguments for the program
        args: Vec<String>,
        /// Working directory for the child (default: the workspace)
        #[arg(long)]
        cwd: Option<PathBuf>,
    },
    /// Run a command in a session's shell and print its output
    Exec {
        id: String,
        command: String,
        /// Per-command timeout in milliseconds
        #[arg(long = "timeout-ms")]
        timeout_ms: Option<u64>,
    },
    /// Write raw input to a session (legacy byte-stream API)
    Send { id: String, data: String },
    /// Drain buffered session output (legacy byte-stream API)
    Read {
        id: String,
        /// How long to wait for the first byte, in milliseconds
        #[arg(long = "timeout-ms")]
        timeout_ms: Option<u64>,
    },
    /// Show holder-verified status for a session
    Status { id: String },
    /// List sessions recorded in this workspace
    List,
    /// Terminate a session
    End { id: String },
    /// Remove sessions with dead holders or unresponsive sockets
    Cleanup,
}

pub async fn execute(args: SessionArgs) -> Result<()> {
    let work_dir = match args.work_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let layout = WorkspaceLayout::new(std::fs::canonicalize(&work_dir)?);
    let manager = SessionManager::new(layout.sessions_dir());

    match args.command {
        SessionCommands::Start { command, args, cwd } => {
            let mut argv = vec![command];
            argv.extend(args);
            let cwd = cwd.unwrap_or_else(|| layout.root().to_path_buf());

            let meta = manager.start(&argv, &cwd).await?;
            println!("{}", meta.session_id);
            Ok(())
        }

        SessionCommands::Exec {
            id,
            command,
            timeout_ms,
        } => {
            let reply = manager
                .exec(&SessionId::new(id), &command, timeout_ms)
                .await?;
            print!("{}", reply.stdout);
            if !reply.stderr.is_empty() {
                eprint!("{}", reply.stderr);
            }
            if reply.exit_code != 0 {
                return Err(ExitError::silent(1).into());
            }
            Ok(())
        }

        SessionCommands::Send { id, data } => {
            manager.write(&SessionId::new(id), &data).await?;
            Ok(())
        }

        SessionCommands::Read { id, timeout_ms } => {
            let data = manager.read(&SessionId::new(id), timeout_ms).await?;
            print!("{}", data);
            Ok(())
        }

        SessionCommands::Status { id } => {
            let status = manager.status(&SessionId::new(id)).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }

        SessionCommands::List => {
            for meta in manager.list()? {
                println!(
                    "{}\tpid={}\tholder={}\t{}",
                    meta.session_id,
                    meta.pid,
                    meta.holder_pid,
                    meta.command.join(" "),
                );
            }
            Ok(())
        }

        SessionCommands::End { id } => {
            manager.end(&SessionId::new(id)).await?;
            Ok(())
        }

        SessionCommands::Cleanup => {
            let removed = manager.cleanup().await?;
            for id in &removed {
                println!("removed {}", id);
            }
            if removed.is_empty() {
                println!("nothing to clean up");
            }
            Ok(())
        }
    }
}
