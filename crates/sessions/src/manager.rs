// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle across CLI invocations.
//!
//! `start` spawns a detached holder daemon and waits for its socket to
//! answer; every other operation resolves the session id through the
//! metadata store and talks to the holder per request. The manager never
//! owns a child process itself.

use crate::client::{ping, request};
use crate::protocol::{ExecReply, Request, Response, SessionStatus};
use crate::store::{SessionMeta, SessionStore};
use crate::wire::{WireError, DEFAULT_IPC_TIMEOUT};
use crate::{socket_path_for, SessionError, SOCKET_PREFIX};
use delta_core::SessionId;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// How long `start` waits for the holder socket to come up.
const STARTUP_DEADLINE: Duration = Duration::from_secs(5);

/// Poll interval while waiting for the holder socket.
const STARTUP_POLL: Duration = Duration::from_millis(50);

/// Default timeout for one exec round trip.
const EXEC_TIMEOUT: Duration = Duration::from_secs(60);

/// Deadline for liveness pings during `status` and `cleanup`.
const PING_DEADLINE: Duration = Duration::from_millis(500);

/// Manages the sessions of one workspace.
#[derive(Debug, Clone)]
pub struct SessionManager {
    store: SessionStore,
}

impl SessionManager {
    pub fn new(sessions_dir: impl Into<PathBuf>) -> Self {
        Self {
            store: SessionStore::new(sessions_dir),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Start a new session: spawn a detached holder for `command` and wait
    /// until its socket answers a ping.
    pub async fn start(
        &self,
        command: &[String],
        cwd: &Path,
    ) -> Result<SessionMeta, SessionError> {
        if command.is_empty() {
            return Err(SessionError::SpawnFailed("empty command".to_string()));
        }
        if !cwd.is_dir() {
            return Err(SessionError::SpawnFailed(format!(
                "working directory does not exist: {}",
                cwd.display()
            )));
        }

        let session_id = SessionId::generate();
        let socket_path = socket_path_for(&session_id)?;

        let holder = find_holder_binary();
        spawn_holder(&holder, &session_id, &socket_path, self.store.sessions_dir(), cwd, command)?;

        // The holder writes metadata before it starts listening, so once the
        // socket answers the record is there to load.
        let start = Instant::now();
        while start.elapsed() < STARTUP_DEADLINE {
            if ping(&socket_path, PING_DEADLINE).await {
                let meta = self
                    .store
                    .load(&session_id)?
                    .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
                info!(
                    session = %session_id,
                    holder_pid = meta.holder_pid,
                    "session started"
                );
                return Ok(meta);
            }
            tokio::time::sleep(STARTUP_POLL).await;
        }

        Err(SessionError::SpawnFailed(format!(
            "holder did not answer on {} within {:?} (binary: {})",
            socket_path.display(),
            STARTUP_DEADLINE,
            holder.display(),
        )))
    }

    /// Run a command to completion in the session's shell.
    pub async fn exec(
        &self,
        id: &SessionId,
        command: &str,
        timeout_ms: Option<u64>,
    ) -> Result<ExecReply, SessionError> {
        let meta = self.require(id)?;
        let io_timeout = timeout_ms
            .map(|ms| Duration::from_millis(ms) + DEFAULT_IPC_TIMEOUT)
            .unwrap_or(EXEC_TIMEOUT);

        let response = self
            .roundtrip(
                &meta,
                &Request::Exec {
                    command: command.to_string(),
                    timeout_ms,
                },
                io_timeout,
            )
            .await?;

        match response {
            Response::Exec(reply) => Ok(reply),
            other => Err(unexpected(id, other)),
        }
    }

    /// Legacy byte-stream write.
    pub async fn write(&self, id: &SessionId, data: &str) -> Result<(), SessionError> {
        let meta = self.require(id)?;
        match self
            .roundtrip(
                &meta,
                &Request::Write {
                    data: data.to_string(),
                },
                DEFAULT_IPC_TIMEOUT,
            )
            .await?
        {
            Response::Ok => Ok(()),
            other => Err(unexpected(id, other)),
        }
    }

    /// Legacy byte-stream read: drain whatever output is buffered.
    pub async fn read(
        &self,
        id: &SessionId,
        timeout_ms: Option<u64>,
    ) -> Result<String, SessionError> {
        let meta = self.require(id)?;
        let io_timeout = timeout_ms
            .map(|ms| Duration::from_millis(ms) + DEFAULT_IPC_TIMEOUT)
            .unwrap_or(DEFAULT_IPC_TIMEOUT);
        match self
            .roundtrip(&meta, &Request::Read { timeout_ms }, io_timeout)
            .await?
        {
            Response::Data { data } => Ok(data),
            other => Err(unexpected(id, other)),
        }
    }

    /// Holder-reported status, after verifying the holder process exists and
    /// the socket answers.
    pub async fn status(&self, id: &SessionId) -> Result<SessionStatus, SessionError> {
        let meta = self.require(id)?;

        if !process_exists(meta.holder_pid) {
            return Err(SessionError::HolderUnreachable {
                id: id.to_string(),
                reason: format!("holder process {} is gone", meta.holder_pid),
            });
        }
        if !ping(&meta.socket_path, PING_DEADLINE).await {
            return Err(SessionError::HolderUnreachable {
                id: id.to_string(),
                reason: format!("no answer on {}", meta.socket_path.display()),
            });
        }

        match self
            .roundtrip(&meta, &Request::Status, DEFAULT_IPC_TIMEOUT)
            .await?
        {
            Response::Status(status) => Ok(status),
            other => Err(unexpected(id, other)),
        }
    }

    /// All sessions with metadata on disk (alive or not).
    pub fn list(&self) -> Result<Vec<SessionMeta>, SessionError> {
        Ok(self.store.list()?)
    }

    /// Terminate the session and remove its metadata.
    pub async fn end(&self, id: &SessionId) -> Result<(), SessionError> {
        let meta = self.require(id)?;

        match self.roundtrip(&meta, &Request::End, DEFAULT_IPC_TIMEOUT).await {
            Ok(Response::Ok) => {}
            Ok(other) => return Err(unexpected(id, other)),
            Err(SessionError::Io(_)) | Err(SessionError::Wire(_)) => {
                // Holder already gone; fall through to cleanup.
                warn!(session = %id, "holder unreachable during end, cleaning up");
            }
            Err(e) => return Err(e),
        }

        let _ = std::fs::remove_file(&meta.socket_path);
        self.store.remove(id)?;
        Ok(())
    }

    /// Remove sessions whose holder is gone or whose socket is unresponsive,
    /// plus orphan sockets left in the socket directory.
    ///
    /// Returns the ids that were removed.
    pub async fn cleanup(&self) -> Result<Vec<SessionId>, SessionError> {
        let mut removed = Vec::new();
        let mut live_sockets = Vec::new();

        for meta in self.store.list()? {
            let holder_alive = process_exists(meta.holder_pid);
            let socket_alive = holder_alive && ping(&meta.socket_path, PING_DEADLINE).await;

            if socket_alive {
                live_sockets.push(meta.socket_path.clone());
                continue;
            }

            info!(
                session = %meta.session_id,
                holder_alive,
                "removing stale session"
            );
            let _ = std::fs::remove_file(&meta.socket_path);
            self.store.remove(&meta.session_id)?;
            removed.push(meta.session_id);
        }

        remove_orphan_sockets(&live_sockets).await;
        Ok(removed)
    }

    fn require(&self, id: &SessionId) -> Result<SessionMeta, SessionError> {
        self.store
            .load(id)?
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    async fn roundtrip(
        &self,
        meta: &SessionMeta,
        req: &Request,
        timeout: Duration,
    ) -> Result<Response, SessionError> {
        let response = request(&meta.socket_path, req, timeout).await?;
        if let Response::Error { kind, message } = response {
            return Err(SessionError::Remote {
                id: meta.session_id.to_string(),
                kind,
                message,
            });
        }
        Ok(response)
    }
}

fn unexpected(id: &SessionId, response: Response) -> SessionError {
    SessionError::UnexpectedResponse(format!("session {}: {:?}", id, response))
}

/// Delete `delta-sock-*.sock` files that no live session references and
/// whose holder does not answer.
async fn remove_orphan_sockets(live: &[PathBuf]) {
    let tmp = std::env::var_os("TMPDIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"));
    let Ok(entries) = std::fs::read_dir(&tmp) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with(SOCKET_PREFIX) || !name.ends_with(".sock") {
            continue;
        }
        if live.contains(&path) {
            continue;
        }
        if ping(&path, PING_DEADLINE).await {
            continue;
        }
        warn!(path = %path.display(), "removing orphan session socket");
        let _ = std::fs::remove_file(&path);
    }
}

/// Locate the holder binary (`deltah`).
///
/// `DELTA_HOLDER_BIN` wins; otherwise a sibling of the current executable;
/// otherwise rely on PATH.
pub fn find_holder_binary() -> PathBuf {
    if let Some(path) = std::env::var_os("DELTA_HOLDER_BIN") {
        return PathBuf::from(path);
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("deltah");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    PathBuf::from("deltah")
}

/// Spawn the holder fully detached: null stdio, own process group, no
/// wait. The holder must not die with this process.
fn spawn_holder(
    holder: &Path,
    session_id: &SessionId,
    socket_path: &Path,
    sessions_dir: &Path,
    cwd: &Path,
    command: &[String],
) -> Result<(), SessionError> {
    use std::os::unix::process::CommandExt;

    let mut cmd = Command::new(holder);
    cmd.arg("--session-id")
        .arg(session_id.as_str())
        .arg("--socket")
        .arg(socket_path)
        .arg("--sessions-dir")
        .arg(sessions_dir)
        .arg("--cwd")
        .arg(cwd)
        .arg("--")
        .args(command)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .process_group(0);

    cmd.spawn()
        .map_err(|e| SessionError::SpawnFailed(format!("{}: {}", holder.display(), e)))?;
    Ok(())
}

/// Check if a process with the given PID exists
pub fn process_exists(pid: u32) -> bool {
    Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
