// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run allocation and resumption.
//!
//! A run is one execution attempt against one workspace. `create_run`
//! allocates the run directory and points `LATEST` at it; `resume_run`
//! follows `LATEST` back. Both return a handle whose metadata writes are
//! atomic (temp file + rename), so readers never observe a half-written
//! record.

use crate::journal::{Journal, JournalError};
use crate::layout::{RunPaths, WorkspaceLayout};
use delta_core::{RunId, RunMetadata, RunStatus};
use fs2::FileExt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Name of the pointer file holding the most recent run id.
pub const LATEST_FILE_NAME: &str = "LATEST";

/// Errors from run allocation, resumption, and metadata updates.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Journal(#[from] JournalError),

    #[error("no runs found in workspace; start one with `delta run`")]
    NoRuns,

    #[error("LATEST points at run '{0}' but that run directory does not exist")]
    DanglingLatest(String),

    #[error("run '{0}' has no journal; the run directory may have been tampered with")]
    MissingJournal(String),

    #[error(
        "another engine loop already holds the workspace lock at {0}; \
         only one run may execute per workspace"
    )]
    LockHeld(PathBuf),
}

/// Generate a sortable run id: compact UTC timestamp plus 6 hex chars.
pub fn generate_run_id() -> RunId {
    let ts = chrono::Utc::now().format("%Y%m%dT%H%M%S%3f");
    let hex = uuid::Uuid::new_v4().simple().to_string();
    RunId::new(format!("{}_{}", ts, &hex[..6]))
}

/// Exclusive advisory lock over a workspace.
///
/// Held for the whole engine invocation; dropped (and so released) on every
/// exit path, including panics.
pub struct WorkspaceLock {
    file: File,
    path: PathBuf,
}

impl WorkspaceLock {
    pub fn acquire(layout: &WorkspaceLayout) -> Result<Self, RunError> {
        let path = layout.lock_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;
        file.try_lock_exclusive()
            .map_err(|_| RunError::LockHeld(path.clone()))?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

/// Handle to an allocated or resumed run.
#[derive(Debug, Clone)]
pub struct RunHandle {
    run_id: RunId,
    paths: RunPaths,
}

impl RunHandle {
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn paths(&self) -> &RunPaths {
        &self.paths
    }

    /// Open (and validate) this run's journal.
    pub fn open_journal(&self) -> Result<Journal, JournalError> {
        Journal::open(&self.paths.journal_path())
    }

    pub fn read_metadata(&self) -> Result<RunMetadata, RunError> {
        let raw = std::fs::read(self.paths.metadata_path())?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Atomically rewrite metadata with a new status and `updated_at`.
    pub fn set_status(&self, status: RunStatus) -> Result<(), RunError> {
        let mut meta = self.read_metadata()?;
        meta.status = status;
        meta.updated_at = crate::now_iso8601();
        self.write_metadata(&meta)
    }

    pub fn write_metadata(&self, meta: &RunMetadata) -> Result<(), RunError> {
        write_atomic(&self.paths.metadata_path(), &serde_json::to_vec_pretty(meta)?)?;
        Ok(())
    }
}

/// Allocate a new run: directories, initial metadata, `LATEST` pointer.
///
/// `LATEST` is written only after the run directory exists, so readers that
/// follow it always find a directory.
pub fn create_run(
    layout: &WorkspaceLayout,
    agent_path: &Path,
    config_hash: &str,
) -> Result<RunHandle, RunError> {
    let run_id = generate_run_id();
    let paths = layout.run_paths(&run_id);

    std::fs::create_dir_all(paths.invocations_dir())?;
    std::fs::create_dir_all(paths.tool_executions_dir())?;

    let now = crate::now_iso8601();
    let meta = RunMetadata {
        run_id: run_id.clone(),
        agent_path: agent_path.to_path_buf(),
        status: RunStatus::Running,
        config_hash: config_hash.to_string(),
        created_at: now.clone(),
        updated_at: now,
    };

    let handle = RunHandle { run_id, paths };
    handle.write_metadata(&meta)?;
    write_latest(layout, &handle.run_id)?;

    Ok(handle)
}

/// Open the most recent run for resumption.
///
/// Follows `LATEST`; when the pointer is missing but runs exist, falls back
/// to the greatest run id (run ids sort by timestamp) with a warning.
/// Refuses runs whose journal is absent or fails validation.
pub fn resume_run(layout: &WorkspaceLayout) -> Result<RunHandle, RunError> {
    let run_id = match read_latest(layout)? {
        Some(id) if layout.run_dir(&id).is_dir() => id,
        Some(id) => match newest_run_dir(layout)? {
            Some(fallback) => {
                warn!(
                    latest = %id,
                    fallback = %fallback,
                    "LATEST names a missing run directory, falling back to newest run"
                );
                fallback
            }
            None => return Err(RunError::DanglingLatest(id.to_string())),
        },
        None => {
            let id = newest_run_dir(layout)?.ok_or(RunError::NoRuns)?;
            warn!(
                run_id = %id,
                "LATEST pointer missing, falling back to newest run directory"
            );
            id
        }
    };

    let paths = layout.run_paths(&run_id);
    if !paths.journal_path().is_file() {
        return Err(RunError::MissingJournal(run_id.to_string()));
    }

    // Validate before handing the run back; a journal that cannot be read
    // must not be resumed.
    let _ = Journal::open(&paths.journal_path())?;

    Ok(RunHandle { run_id, paths })
}

fn read_latest(layout: &WorkspaceLayout) -> Result<Option<RunId>, RunError> {
    match std::fs::read_to_string(layout.latest_path()) {
        Ok(content) => {
            let trimmed = content.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(RunId::new(trimmed)))
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn write_latest(layout: &WorkspaceLayout, run_id: &RunId) -> Result<(), RunError> {
    write_atomic(&layout.latest_path(), run_id.as_str().as_bytes())
}

fn newest_run_dir(layout: &WorkspaceLayout) -> Result<Option<RunId>, RunError> {
    let runs_dir = layout.runs_dir();
    if !runs_dir.is_dir() {
        return Ok(None);
    }

    let mut names: Vec<String> = Vec::new();
    for entry in std::fs::read_dir(&runs_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names.pop().map(RunId::new))
}

/// Write via temp file + rename in the destination directory, then fsync the
/// file so the rename lands durable content.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RunError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let tmp = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp)?;
        io::Write::write_all(&mut file, bytes)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
