// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session metadata under the workspace.
//!
//! The holder owns these files: it writes `metadata.json` at startup and
//! appends to `history.log` per exec. The CLI only reads them (and removes
//! whole directories during cleanup), so no file is read and written by two
//! processes at once.

use delta_core::SessionId;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// The `metadata.json` record for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMeta {
    pub session_id: SessionId,
    /// Child process pid.
    pub pid: u32,
    pub holder_pid: u32,
    pub cwd: PathBuf,
    pub command: Vec<String>,
    pub socket_path: PathBuf,
    pub created_at: String,
}

/// Reader/writer for `.sessions/<id>/` directories.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions_dir: PathBuf,
}

impl SessionStore {
    pub fn new(sessions_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions_dir: sessions_dir.into(),
        }
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    pub fn session_dir(&self, id: &SessionId) -> PathBuf {
        self.sessions_dir.join(id.as_str())
    }

    pub fn metadata_path(&self, id: &SessionId) -> PathBuf {
        self.session_dir(id).join("metadata.json")
    }

    pub fn history_path(&self, id: &SessionId) -> PathBuf {
        self.session_dir(id).join("history.log")
    }

    /// Atomically write the metadata record (temp file + rename).
    pub fn save(&self, meta: &SessionMeta) -> Result<(), io::Error> {
        let dir = self.session_dir(&meta.session_id);
        std::fs::create_dir_all(&dir)?;

        let path = self.metadata_path(&meta.session_id);
        let tmp = path.with_extension("tmp");
        let mut bytes = serde_json::to_vec_pretty(meta).map_err(io::Error::other)?;
        bytes.push(b'\n');
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    pub fn load(&self, id: &SessionId) -> Result<Option<SessionMeta>, io::Error> {
        match std::fs::read(self.metadata_path(id)) {
            Ok(raw) => Ok(Some(
                serde_json::from_slice(&raw).map_err(io::Error::other)?,
            )),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// All sessions with readable metadata, sorted by id.
    pub fn list(&self) -> Result<Vec<SessionMeta>, io::Error> {
        let mut sessions = Vec::new();
        let entries = match std::fs::read_dir(&self.sessions_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(sessions),
            Err(e) => return Err(e),
        };

        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let id = SessionId::new(entry.file_name().to_string_lossy().into_owned());
            match self.load(&id) {
                Ok(Some(meta)) => sessions.push(meta),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        session = %id,
                        error = %e,
                        "skipping session with unreadable metadata"
                    );
                }
            }
        }

        sessions.sort_by(|a, b| a.session_id.as_str().cmp(b.session_id.as_str()));
        Ok(sessions)
    }

    /// Remove a session's metadata directory.
    pub fn remove(&self, id: &SessionId) -> Result<(), io::Error> {
        match std::fs::remove_dir_all(self.session_dir(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Append one line to the session's history log.
    pub fn append_history(&self, id: &SessionId, line: &str) -> Result<(), io::Error> {
        use std::io::Write;
        std::fs::create_dir_all(self.session_dir(id))?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.history_path(id))?;
        writeln!(file, "{}", line)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
