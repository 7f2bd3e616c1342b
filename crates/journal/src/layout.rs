// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace and run directory layout.
//!
//! The workspace is the agent's entire addressable environment. The control
//! plane lives under `.delta/`; session metadata lives under `.sessions/`;
//! everything else is user-visible files.

use delta_core::RunId;
use std::path::{Path, PathBuf};

/// Paths derived from a workspace root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    root: PathBuf,
}

impl WorkspaceLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `.delta/` control plane.
    pub fn control_dir(&self) -> PathBuf {
        self.root.join(".delta")
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.control_dir().join("runs")
    }

    /// The `LATEST` pointer file (plain text, not a symlink).
    pub fn latest_path(&self) -> PathBuf {
        self.control_dir().join(crate::run::LATEST_FILE_NAME)
    }

    /// Outputs of computed context generators.
    pub fn context_artifacts_dir(&self) -> PathBuf {
        self.control_dir().join("context_artifacts")
    }

    /// Advisory lock guarding one engine loop per workspace.
    pub fn lock_path(&self) -> PathBuf {
        self.control_dir().join("engine.lock")
    }

    /// Session metadata, user-visible.
    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join(".sessions")
    }

    pub fn run_dir(&self, run_id: &RunId) -> PathBuf {
        self.runs_dir().join(run_id.as_str())
    }

    pub fn run_paths(&self, run_id: &RunId) -> RunPaths {
        RunPaths::new(self.run_dir(run_id))
    }
}

/// Paths inside one run directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    dir: PathBuf,
}

impl RunPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn journal_path(&self) -> PathBuf {
        self.dir.join(crate::JOURNAL_FILE_NAME)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join("metadata.json")
    }

    pub fn engine_log_path(&self) -> PathBuf {
        self.dir.join("engine.log")
    }

    pub fn io_dir(&self) -> PathBuf {
        self.dir.join("io")
    }

    /// LLM request/response pairs.
    pub fn invocations_dir(&self) -> PathBuf {
        self.io_dir().join("invocations")
    }

    /// Per-call argv, stdin, stdout, stderr.
    pub fn tool_executions_dir(&self) -> PathBuf {
        self.io_dir().join("tool_executions")
    }

    /// Present only while the run is waiting for input.
    pub fn interaction_dir(&self) -> PathBuf {
        self.dir.join("interaction")
    }

    pub fn interaction_request_path(&self) -> PathBuf {
        self.interaction_dir().join("request.json")
    }

    pub fn interaction_response_path(&self) -> PathBuf {
        self.interaction_dir().join("response.txt")
    }
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
