// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! delta-sessions: persistent interactive sessions.
//!
//! A session is a long-lived child process (shell, REPL) owned by a detached
//! holder daemon, never by the CLI that created it — a PTY master closed by
//! an exiting CLI would SIGHUP the child. The CLI talks to the holder over a
//! UNIX-domain socket, one connection per operation, so any later invocation
//! can address the session by id.
//!
//! Sockets live in `/tmp` behind a short prefix (socket paths must fit the
//! 104-byte limit of the most restrictive platforms); the user-visible
//! metadata lives under the workspace's `.sessions/<id>/`.

mod client;
mod manager;
mod protocol;
mod store;
mod wire;

pub use client::{ping, request};
pub use manager::{find_holder_binary, process_exists, SessionManager};
pub use protocol::{ExecReply, Request, Response, SessionStatus};
pub use store::{SessionMeta, SessionStore};
pub use wire::{read_message, write_message, WireError, DEFAULT_IPC_TIMEOUT, MAX_MESSAGE_SIZE};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Longest socket path accepted, matching the tightest `sun_path` among
/// supported platforms.
pub const MAX_SOCKET_PATH: usize = 104;

/// Prefix for holder sockets under `/tmp`.
pub const SOCKET_PREFIX: &str = "delta-sock-";

/// Errors from session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("session not found: {0}")]
    NotFound(String),

    #[error(
        "socket path is {len} bytes, exceeding the {MAX_SOCKET_PATH}-byte limit: {path}; \
         use a shorter session id or TMPDIR"
    )]
    SocketPathTooLong { path: String, len: usize },

    #[error("failed to start session holder: {0}")]
    SpawnFailed(String),

    #[error("session '{id}' holder is unreachable: {reason}; run `delta session cleanup`")]
    HolderUnreachable { id: String, reason: String },

    #[error("session '{id}' error: {kind}: {message}")]
    Remote {
        id: String,
        kind: String,
        message: String,
    },

    #[error("unexpected response from holder: {0}")]
    UnexpectedResponse(String),
}

/// Socket path for a session id: `/tmp/delta-sock-<suffix>.sock`.
///
/// Only the short id suffix goes into the path to stay far below the limit;
/// the path is still validated because `TMPDIR` is honored when set.
pub fn socket_path_for(session_id: &delta_core::SessionId) -> Result<PathBuf, SessionError> {
    let tmp = std::env::var_os("TMPDIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"));
    let suffix = session_id
        .as_str()
        .rsplit('_')
        .next()
        .unwrap_or(session_id.as_str());
    let path = tmp.join(format!("{SOCKET_PREFIX}{suffix}.sock"));
    validate_socket_path(&path)?;
    Ok(path)
}

/// Reject socket paths that would not fit `sun_path`.
pub fn validate_socket_path(path: &Path) -> Result<(), SessionError> {
    let len = path.as_os_str().len();
    if len >= MAX_SOCKET_PATH {
        return Err(SessionError::SocketPathTooLong {
            path: path.display().to_string(),
            len,
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
