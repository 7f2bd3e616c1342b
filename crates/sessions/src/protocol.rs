// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control messages between the CLI and a session holder.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Request from CLI to holder
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Liveness check
    Ping,

    /// Run a command to completion in the session's shell
    Exec {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },

    /// Legacy byte-stream API: write raw input
    Write { data: String },

    /// Legacy byte-stream API: drain buffered output
    Read {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },

    /// Describe the session
    Status,

    /// Terminate the child and the holder
    End,
}

/// Result of one `exec` round trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecReply {
    /// Interleaved output scraped from the PTY (streams are merged).
    pub stdout: String,
    /// Always empty under the PTY execution model; kept for API stability.
    #[serde(default)]
    pub stderr: String,
    pub exit_code: i32,
    pub duration_ms: u64,
}

/// Session description returned by `status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionStatus {
    pub session_id: String,
    /// Child process pid.
    pub pid: u32,
    pub holder_pid: u32,
    /// False once the child has exited (the holder may outlive it).
    pub alive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub command: Vec<String>,
    pub cwd: PathBuf,
    pub started_at: String,
}

/// Response from holder to CLI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Pong,

    /// Generic acknowledgement (`write`, `end`)
    Ok,

    Exec(ExecReply),

    /// Drained output for `read`
    Data { data: String },

    Status(SessionStatus),

    /// Typed failure
    Error { kind: String, message: String },
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
