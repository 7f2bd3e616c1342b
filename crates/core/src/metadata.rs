// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run status and per-run metadata record.

use crate::id::RunId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Status of a run, stored in `metadata.json` and in `RUN_END` payloads.
///
/// Serialized kebab-case (`waiting-for-input`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    WaitingForInput,
    Interrupted,
}

impl RunStatus {
    /// True for states from which the run will not continue without a new
    /// CLI invocation.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::WaitingForInput => "waiting-for-input",
            RunStatus::Interrupted => "interrupted",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `metadata.json` record owned by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: RunId,
    pub agent_path: PathBuf,
    pub status: RunStatus,
    /// SHA-256 of the agent configuration file at run creation.
    #[serde(default)]
    pub config_hash: String,
    /// ISO-8601 UTC timestamps.
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
