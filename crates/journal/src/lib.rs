// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! delta-journal: on-disk state for runs.
//!
//! Everything a run is lives here: the append-only event journal, the run
//! directory layout with its `LATEST` pointer and metadata record, and the
//! per-call I/O audit. No in-memory state survives across iterations; these
//! files are the single source of truth.

mod audit;
mod journal;
mod layout;
mod run;

pub use audit::{AuditLog, ToolExecutionRecord};
pub use journal::{CorruptLine, Journal, JournalError, JournalRecord, JOURNAL_FILE_NAME};
pub use layout::{RunPaths, WorkspaceLayout};
pub use run::{
    create_run, generate_run_id, resume_run, RunError, RunHandle, WorkspaceLock, LATEST_FILE_NAME,
};

/// Current UTC time as the ISO-8601 string used in journal records and
/// metadata (millisecond precision, `Z` suffix).
pub fn now_iso8601() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
