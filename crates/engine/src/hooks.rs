// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle hook execution.
//!
//! Hooks are external commands fed a JSON payload on stdin. They observe;
//! they cannot mutate journal events. A non-zero exit is an observation
//! under `warn` and a fatal error under `abort`. Timeouts escalate SIGTERM
//! → (1 s grace) → SIGKILL, and neither children nor pipe handles outlive
//! the call.

use crate::error::EngineError;
use delta_config::{HookDef, HooksConfig, OnFailure};
use delta_core::LifecyclePoint;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::warn;

/// Journal bound for combined hook output.
pub const HOOK_OUTPUT_CAP: usize = 8 * 1024;

/// Grace period between SIGTERM and SIGKILL.
const KILL_GRACE: Duration = Duration::from_secs(1);

/// Result of one hook execution, mirrored into `HOOK_EXECUTED`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOutcome {
    pub point: LifecyclePoint,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    /// Combined stdout+stderr, truncated to [`HOOK_OUTPUT_CAP`].
    pub output: String,
    pub timed_out: bool,
}

impl HookOutcome {
    pub fn failed(&self) -> bool {
        self.timed_out || self.exit_code != Some(0)
    }
}

/// Outcomes of one lifecycle point, plus whether an `abort` hook fired.
#[derive(Debug)]
pub struct HooksRun {
    pub outcomes: Vec<HookOutcome>,
    /// Set when a failing hook had the `abort` policy; the engine turns
    /// this into [`EngineError::HookAborted`] after journaling.
    pub abort: Option<EngineError>,
}

/// Run every hook configured for `point`, in declaration order.
///
/// All outcomes are returned for journaling even when a hook aborts; hooks
/// after an aborting one do not run.
pub async fn run_hooks(
    hooks: &HooksConfig,
    point: LifecyclePoint,
    payload: &serde_json::Value,
    workspace: &Path,
) -> HooksRun {
    let mut outcomes = Vec::new();
    let mut abort = None;

    for hook in hooks.for_point(point) {
        let outcome = run_hook(hook, point, payload, workspace).await;
        let failed = outcome.failed();

        if failed {
            warn!(
                point = %point,
                exit_code = ?outcome.exit_code,
                timed_out = outcome.timed_out,
                "hook failed"
            );
        }

        if failed && hook.on_failure == OnFailure::Abort {
            abort = Some(EngineError::HookAborted {
                point,
                message: format!(
                    "exit={:?} timed_out={} output={}",
                    outcome.exit_code,
                    outcome.timed_out,
                    outcome.output.trim()
                ),
            });
            outcomes.push(outcome);
            break;
        }
        outcomes.push(outcome);
    }

    HooksRun { outcomes, abort }
}

async fn run_hook(
    hook: &HookDef,
    point: LifecyclePoint,
    payload: &serde_json::Value,
    workspace: &Path,
) -> HookOutcome {
    let started = Instant::now();
    let timeout = Duration::from_millis(hook.timeout_ms);

    let Some(program) = hook.command.first() else {
        return HookOutcome {
            point,
            exit_code: None,
            duration_ms: 0,
            output: "hook has an empty command".to_string(),
            timed_out: false,
        };
    };

    let mut cmd = Command::new(program);
    cmd.args(&hook.command[1..])
        .current_dir(workspace)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return HookOutcome {
                point,
                exit_code: None,
                duration_ms: started.elapsed().as_millis() as u64,
                output: format!("failed to spawn '{}': {}", program, e),
                timed_out: false,
            }
        }
    };

    if let Some(mut stdin) = child.stdin.take() {
        let bytes = payload.to_string().into_bytes();
        tokio::spawn(async move {
            let _ = stdin.write_all(&bytes).await;
        });
    }

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let output_task = tokio::spawn(async move {
        let mut combined = String::new();
        if let Some(mut out) = stdout {
            let mut buf = String::new();
            let _ = out.read_to_string(&mut buf).await;
            combined.push_str(&buf);
        }
        if let Some(mut err) = stderr {
            let mut buf = String::new();
            let _ = err.read_to_string(&mut buf).await;
            combined.push_str(&buf);
        }
        combined
    });

    let (exit_code, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => (status.code(), false),
        Ok(Err(_)) => (None, false),
        Err(_) => {
            terminate(&mut child).await;
            (None, true)
        }
    };

    let mut output = output_task.await.unwrap_or_default();
    if output.len() > HOOK_OUTPUT_CAP {
        let mut cut = HOOK_OUTPUT_CAP;
        while cut > 0 && !output.is_char_boundary(cut) {
            cut -= 1;
        }
        output.truncate(cut);
        output.push_str("\n[output truncated]");
    }

    HookOutcome {
        point,
        exit_code,
        duration_ms: started.elapsed().as_millis() as u64,
        output,
        timed_out,
    }
}

/// SIGTERM, wait out the grace period, then SIGKILL.
async fn terminate(child: &mut tokio::process::Child) {
    if let Some(pid) = child.id() {
        let _ = nix::sys::signal::kill(
            nix::unistd::Pid::from_raw(pid as i32),
            nix::sys::signal::Signal::SIGTERM,
        );
        if tokio::time::timeout(KILL_GRACE, child.wait()).await.is_ok() {
            return;
        }
    }
    let _ = child.start_kill();
    let _ = child.wait().await;
}

#[cfg(test)]
#[path = "hooks_tests.rs"]
mod tests;
