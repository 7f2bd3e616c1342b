// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-run I/O audit.
//!
//! Every LLM invocation and every tool execution is persisted under the
//! run's `io/` directory before the corresponding journal event is
//! appended. Files are keyed by an increasing integer so the audit reads in
//! execution order. Writes use whole-file APIs; no handle outlives a call.

use crate::layout::RunPaths;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;

/// Full record of one tool execution, as written to
/// `io/tool_executions/<n>_<tool>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecutionRecord {
    pub tool: String,
    pub call_id: String,
    pub argv: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin: Option<String>,
    pub stdout: String,
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    #[serde(default)]
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Writer for a run's audit directories.
pub struct AuditLog {
    invocations_dir: PathBuf,
    tool_executions_dir: PathBuf,
    next_invocation: u64,
    next_execution: u64,
}

impl AuditLog {
    /// Open the audit directories, continuing the numbering of any existing
    /// files (resume appends, never overwrites).
    pub fn open(paths: &RunPaths) -> Result<Self, io::Error> {
        let invocations_dir = paths.invocations_dir();
        let tool_executions_dir = paths.tool_executions_dir();
        std::fs::create_dir_all(&invocations_dir)?;
        std::fs::create_dir_all(&tool_executions_dir)?;

        Ok(Self {
            next_invocation: max_index(&invocations_dir)? + 1,
            next_execution: max_index(&tool_executions_dir)? + 1,
            invocations_dir,
            tool_executions_dir,
        })
    }

    /// Persist one LLM request/response pair.
    pub fn record_invocation(
        &mut self,
        request: &serde_json::Value,
        response: &serde_json::Value,
    ) -> Result<(), io::Error> {
        let n = self.next_invocation;
        write_json(&self.invocations_dir.join(format!("{n:04}_request.json")), request)?;
        write_json(
            &self.invocations_dir.join(format!("{n:04}_response.json")),
            response,
        )?;
        self.next_invocation += 1;
        Ok(())
    }

    /// Persist one tool execution record, returning its path.
    ///
    /// Callers append the `ACTION_RESULT` event only after this returns.
    pub fn record_tool_execution(
        &mut self,
        record: &ToolExecutionRecord,
    ) -> Result<PathBuf, io::Error> {
        let n = self.next_execution;
        let path = self
            .tool_executions_dir
            .join(format!("{n:04}_{}.json", record.tool));
        write_json(
            &path,
            &serde_json::to_value(record).map_err(io::Error::other)?,
        )?;
        self.next_execution += 1;
        Ok(path)
    }
}

fn write_json(path: &std::path::Path, value: &serde_json::Value) -> Result<(), io::Error> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(io::Error::other)?;
    bytes.push(b'\n');
    std::fs::write(path, bytes)
}

/// Highest numeric prefix among `NNNN_*.json` files, or 0.
fn max_index(dir: &std::path::Path) -> Result<u64, io::Error> {
    let mut max = 0u64;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(prefix) = name.split('_').next() {
            if let Ok(n) = prefix.parse::<u64>() {
                max = max.max(n);
            }
        }
    }
    Ok(max)
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
