// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool invocation.
//!
//! Resolves a tool call to argv + stdin, runs the child in the workspace
//! with a clean declared environment, and captures bounded output. A tool
//! failing — bad arguments, spawn error, non-zero exit, timeout — is a
//! normal observation carried in the outcome, never an engine error.

use delta_config::{AgentConfig, InjectAs, ToolDef};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

/// Result of one tool call, mirrored into the `ACTION_RESULT` payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolOutcome {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub truncated: bool,
    pub error: Option<String>,
}

impl ToolOutcome {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

/// One resolved invocation: what ran plus what came back. Feeds both the
/// audit record and the journal event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub argv: Vec<String>,
    pub stdin: Option<String>,
    pub outcome: ToolOutcome,
}

/// Executes configured tools for one agent and workspace.
pub struct ToolExecutor<'a> {
    config: &'a AgentConfig,
    workspace: &'a Path,
    agent_home: &'a Path,
}

impl<'a> ToolExecutor<'a> {
    pub fn new(config: &'a AgentConfig, workspace: &'a Path, agent_home: &'a Path) -> Self {
        Self {
            config,
            workspace,
            agent_home,
        }
    }

    /// Invoke `tool` with the given argument map.
    pub async fn invoke(&self, tool: &ToolDef, args: &BTreeMap<String, String>) -> ToolInvocation {
        let (argv, stdin) = match bind_parameters(tool, args) {
            Ok(bound) => bound,
            Err(message) => {
                return ToolInvocation {
                    argv: tool.command.clone(),
                    stdin: None,
                    outcome: ToolOutcome::rejected(message),
                }
            }
        };

        let timeout = tool
            .timeout_ms
            .or(self.config.tool_timeout_ms)
            .map(Duration::from_millis);
        let cap = self.config.output_cap_bytes;

        let outcome = self
            .spawn_and_capture(&argv, stdin.as_deref(), timeout, cap)
            .await;

        ToolInvocation {
            argv,
            stdin,
            outcome,
        }
    }

    async fn spawn_and_capture(
        &self,
        argv: &[String],
        stdin: Option<&str>,
        timeout: Option<Duration>,
        cap: usize,
    ) -> ToolOutcome {
        let started = Instant::now();

        let Some(program) = argv.first() else {
            return ToolOutcome::rejected("tool has an empty command");
        };

        let mut cmd = Command::new(program);
        cmd.args(&argv[1..])
            .current_dir(self.workspace)
            .env_clear()
            .envs(&self.config.env)
            .env("CWD", self.workspace)
            .env("AGENT_HOME", self.agent_home)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Tools still need to resolve binaries; a declared PATH wins.
        if !self.config.env.contains_key("PATH") {
            if let Some(path) = std::env::var_os("PATH") {
                cmd.env("PATH", path);
            }
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ToolOutcome::rejected(format!("failed to spawn '{}': {}", program, e))
            }
        };

        if let (Some(bytes), Some(mut handle)) = (stdin, child.stdin.take()) {
            let bytes = bytes.as_bytes().to_vec();
            tokio::spawn(async move {
                let _ = handle.write_all(&bytes).await;
                // Dropping the handle closes the pipe.
            });
        }

        let stdout_task = child.stdout.take().map(|r| tokio::spawn(read_capped(r, cap)));
        let stderr_task = child.stderr.take().map(|r| tokio::spawn(read_capped(r, cap)));

        let (status, timed_out) = match timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(result) => (result, false),
                Err(_) => {
                    let _ = child.start_kill();
                    (child.wait().await, true)
                }
            },
            None => (child.wait().await, false),
        };

        let (stdout, out_truncated) = join_capture(stdout_task).await;
        let (stderr, err_truncated) = join_capture(stderr_task).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match status {
            _ if timed_out => ToolOutcome {
                exit_code: None,
                stdout,
                stderr,
                duration_ms,
                truncated: out_truncated || err_truncated,
                error: Some(format!(
                    "timed out after {}ms",
                    timeout.map(|t| t.as_millis() as u64).unwrap_or(0)
                )),
            },
            Ok(status) => ToolOutcome {
                exit_code: status.code(),
                stdout,
                stderr,
                duration_ms,
                truncated: out_truncated || err_truncated,
                error: None,
            },
            Err(e) => ToolOutcome {
                exit_code: None,
                stdout,
                stderr,
                duration_ms,
                truncated: out_truncated || err_truncated,
                error: Some(format!("wait failed: {}", e)),
            },
        }
    }
}

/// Bind declared parameters against the argument map.
///
/// Arguments and option pairs are appended in declaration order; the lone
/// stdin parameter becomes the child's standard input. Unknown keys and
/// missing required parameters reject the call.
fn bind_parameters(
    tool: &ToolDef,
    args: &BTreeMap<String, String>,
) -> Result<(Vec<String>, Option<String>), String> {
    for key in args.keys() {
        if !tool.parameters.iter().any(|p| &p.name == key) {
            return Err(format!(
                "unknown parameter '{}' for tool '{}'",
                key, tool.name
            ));
        }
    }

    let mut argv = tool.command.clone();
    let mut stdin = None;

    for param in &tool.parameters {
        let value = args.get(&param.name);
        match (value, param.required) {
            (None, true) => {
                return Err(format!(
                    "missing required parameter '{}' for tool '{}'",
                    param.name, tool.name
                ))
            }
            (None, false) => continue,
            (Some(value), _) => match param.inject_as {
                InjectAs::Argument => argv.push(value.clone()),
                InjectAs::Option => {
                    let flag = param
                        .option_name
                        .clone()
                        .ok_or_else(|| format!("parameter '{}' has no flag", param.name))?;
                    argv.push(flag);
                    argv.push(value.clone());
                }
                InjectAs::Stdin => stdin = Some(value.clone()),
            },
        }
    }

    Ok((argv, stdin))
}

/// Read up to `cap` bytes, then drain and discard the rest so the child
/// never blocks on a full pipe.
async fn read_capped<R: tokio::io::AsyncRead + Unpin>(mut reader: R, cap: usize) -> (String, bool) {
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 8192];
    let mut truncated = false;

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if buf.len() < cap {
                    let take = n.min(cap - buf.len());
                    buf.extend_from_slice(&chunk[..take]);
                    if take < n {
                        truncated = true;
                    }
                } else {
                    truncated = true;
                }
            }
        }
    }

    (String::from_utf8_lossy(&buf).into_owned(), truncated)
}

async fn join_capture(
    task: Option<tokio::task::JoinHandle<(String, bool)>>,
) -> (String, bool) {
    match task {
        Some(task) => task.await.unwrap_or((String::new(), false)),
        None => (String::new(), false),
    }
}

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
