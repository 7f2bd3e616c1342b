// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test helpers for behavioral specifications.
//!
//! Provides a small DSL for driving the delta CLI against throwaway
//! agent/workspace pairs with a replay LLM script.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Returns the path to a binary built by this workspace.
///
/// Resolves relative to the test binary itself when CARGO_MANIFEST_DIR is
/// stale (e.g. compiled by a removed worktree into a shared target
/// directory).
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    // The test binary lives at target/debug/deps/specs-<hash>, so its
    // grandparent is target/debug/ where delta and deltah are built.
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

/// Returns the path to the delta binary.
pub fn delta_binary() -> PathBuf {
    binary_path("delta")
}

/// Returns the path to the deltah session holder binary.
pub fn holder_binary() -> PathBuf {
    binary_path("deltah")
}

/// Returns a Command configured to run the delta binary.
pub fn delta_cmd() -> Command {
    let mut cmd = Command::new(delta_binary());
    // The CLI resolves the holder next to its own binary; make it explicit
    // so the specs do not depend on PATH.
    cmd.env("DELTA_HOLDER_BIN", holder_binary());
    cmd
}

pub fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// A throwaway agent + workspace pair with a replay LLM script.
pub struct World {
    pub dir: tempfile::TempDir,
    pub agent_dir: PathBuf,
    pub workspace: PathBuf,
    pub script: PathBuf,
}

pub const HELLO_AGENT: &str = r#"
name: hello
tools:
  - name: say_hello
    command: ["echo", "hello, world"]
"#;

impl World {
    pub fn new(agent_yaml: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let agent_dir = dir.path().join("agent");
        let workspace = dir.path().join("workspace");
        std::fs::create_dir_all(&agent_dir).unwrap();
        std::fs::create_dir_all(&workspace).unwrap();
        std::fs::write(agent_dir.join("agent.yaml"), agent_yaml).unwrap();
        std::fs::write(agent_dir.join("system_prompt.md"), "You are a test agent.\n").unwrap();

        Self {
            script: dir.path().join("replay.jsonl"),
            dir,
            agent_dir,
            workspace,
        }
    }

    /// Write the replay script, one canned response per line.
    pub fn script_lines(&self, lines: &[&str]) {
        std::fs::write(&self.script, format!("{}\n", lines.join("\n"))).unwrap();
    }

    /// Run `delta run` with the given extra arguments.
    pub fn run(&self, extra: &[&str]) -> Output {
        let mut cmd = delta_cmd();
        cmd.arg("run")
            .arg("--agent")
            .arg(&self.agent_dir)
            .arg("--work-dir")
            .arg(&self.workspace)
            .env("DELTA_LLM", format!("replay:{}", self.script.display()))
            .args(extra);
        cmd.output().expect("delta should run")
    }

    /// Run `delta session <args>` against this workspace.
    pub fn session(&self, extra: &[&str]) -> Output {
        let mut cmd = delta_cmd();
        cmd.arg("session")
            .arg("--work-dir")
            .arg(&self.workspace)
            .args(extra);
        cmd.output().expect("delta should run")
    }

    pub fn latest_run_dir(&self) -> PathBuf {
        let latest = std::fs::read_to_string(self.workspace.join(".delta/LATEST")).unwrap();
        self.workspace.join(".delta/runs").join(latest.trim())
    }

    pub fn journal_path(&self) -> PathBuf {
        self.latest_run_dir().join("journal.jsonl")
    }

    /// Event `type` values from the latest run's journal, in seq order.
    pub fn journal_kinds(&self) -> Vec<String> {
        self.journal_values()
            .iter()
            .map(|v| v["type"].as_str().unwrap().to_string())
            .collect()
    }

    pub fn journal_values(&self) -> Vec<serde_json::Value> {
        journal_values(&self.journal_path())
    }

    pub fn metadata(&self) -> serde_json::Value {
        let raw = std::fs::read(self.latest_run_dir().join("metadata.json")).unwrap();
        serde_json::from_slice(&raw).unwrap()
    }

    pub fn response_path(&self) -> PathBuf {
        self.latest_run_dir().join("interaction/response.txt")
    }
}

pub fn journal_values(path: &Path) -> Vec<serde_json::Value> {
    let content = std::fs::read_to_string(path).unwrap();
    let mut values: Vec<serde_json::Value> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    values.sort_by_key(|v| v["seq"].as_u64().unwrap());
    values
}

pub fn assert_exit(output: &Output, code: i32) {
    assert_eq!(
        output.status.code(),
        Some(code),
        "expected exit {code}\nstdout: {}\nstderr: {}",
        stdout_of(output),
        stderr_of(output),
    );
}
