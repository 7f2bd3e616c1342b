// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSONL event journal.
//!
//! Each entry is a single line of JSON:
//! `{"seq":N,"timestamp":"...","type":"EVENT","payload":{...}}\n`
//!
//! The file is sacrosanct: nothing rewrites or pretty-prints it. Appends go
//! through an append-only handle and are fsync'd individually, so any
//! interrupt between two events leaves a readable prefix.

use delta_core::Event;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// The fixed journal file name. A different basename means an external tool
/// renamed the file.
pub const JOURNAL_FILE_NAME: &str = "journal.jsonl";

/// Bytes of the file head inspected by the format check.
const FORMAT_CHECK_HEAD: usize = 512;

/// Errors that can occur in journal operations
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(
        "journal file is named '{found}', expected '{JOURNAL_FILE_NAME}'; \
         an external tool may have renamed it. Restore the original name and retry."
    )]
    BadFileName { found: String },

    #[error(
        "journal was rewritten as a JSON array (starts with '['); \
         an editor may have reformatted it. The journal must stay one compact \
         JSON object per line. Restore it from the original or start a new run."
    )]
    ArrayFormat,

    #[error(
        "journal contains pretty-printed JSON; an editor may have reformatted it. \
         The journal must stay one compact JSON object per line. Restore it from \
         the original or start a new run."
    )]
    PrettyPrinted,

    #[error("corrupt journal line {line}: {message}")]
    CorruptLine { line: usize, message: String },

    #[error("journal seq values are not contiguous: expected {expected}, found {found}")]
    SeqGap { expected: u64, found: u64 },
}

/// One journal entry: engine-assigned seq, write timestamp, and the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalRecord {
    pub seq: u64,
    pub timestamp: String,
    #[serde(flatten)]
    pub event: Event,
}

/// Location of the first unparseable line, reported by tolerant reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptLine {
    /// 1-based line number.
    pub line: usize,
    pub message: String,
}

/// Append-only journal over a `journal.jsonl` file.
#[derive(Debug)]
pub struct Journal {
    file: File,
    path: PathBuf,
    last_seq: u64,
}

impl Journal {
    /// Open or create the journal at `path`.
    ///
    /// Existing files pass the format check and a full scan before any
    /// append is allowed; a journal that cannot be read must not be
    /// extended.
    pub fn open(path: &Path) -> Result<Self, JournalError> {
        validate_file_name(path)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let existed = path.exists();
        if existed {
            validate_format(path)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        let mut journal = Self {
            file,
            path: path.to_owned(),
            last_seq: 0,
        };

        if existed {
            let records = journal.read_all_ordered()?;
            journal.last_seq = records.last().map(|r| r.seq).unwrap_or(0);
        }

        Ok(journal)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Highest seq written so far (0 for an empty journal).
    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    /// Append an event, assigning the next seq.
    ///
    /// The line is written with a single `write_all` and fsync'd before
    /// returning; a success here is the durability point for the event.
    pub fn append(&mut self, event: &Event) -> Result<u64, JournalError> {
        let seq = self.last_seq + 1;
        let timestamp = crate::now_iso8601();
        let record = JournalRecordRef {
            seq,
            timestamp: &timestamp,
            event,
        };

        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.file.sync_all()?;

        self.last_seq = seq;
        Ok(seq)
    }

    /// Read every record, ordered by seq and verified contiguous from 1.
    ///
    /// Any unparseable line is an error carrying its 1-based line number.
    pub fn read_all_ordered(&self) -> Result<Vec<JournalRecord>, JournalError> {
        let (mut records, corrupt) = self.read_lines()?;
        if let Some(corrupt) = corrupt {
            return Err(JournalError::CorruptLine {
                line: corrupt.line,
                message: corrupt.message,
            });
        }

        records.sort_by_key(|r| r.seq);
        verify_contiguous(&records)?;
        Ok(records)
    }

    /// Tolerant read: the well-formed prefix plus the first corruption, if
    /// any. The prefix is still ordered and checked for contiguity; callers
    /// decide whether a trailing corrupt line is fatal.
    pub fn read_valid_prefix(
        &self,
    ) -> Result<(Vec<JournalRecord>, Option<CorruptLine>), JournalError> {
        let (mut records, corrupt) = self.read_lines()?;
        if let Some(ref corrupt) = corrupt {
            warn!(
                path = %self.path.display(),
                line = corrupt.line,
                "journal has a corrupt line, returning valid prefix"
            );
        }

        records.sort_by_key(|r| r.seq);
        verify_contiguous(&records)?;
        Ok((records, corrupt))
    }

    /// Parse lines in file order, stopping at the first corrupt line.
    fn read_lines(&self) -> Result<(Vec<JournalRecord>, Option<CorruptLine>), JournalError> {
        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);

        let mut records = Vec::new();
        let mut line = String::new();
        let mut line_no = 0usize;

        loop {
            line.clear();
            line_no += 1;
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    return Ok((
                        records,
                        Some(CorruptLine {
                            line: line_no,
                            message: "not valid UTF-8".to_string(),
                        }),
                    ));
                }
                Err(e) => return Err(e.into()),
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<JournalRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Ok((
                        records,
                        Some(CorruptLine {
                            line: line_no,
                            message: e.to_string(),
                        }),
                    ));
                }
            }
        }

        Ok((records, None))
    }
}

/// Serialization helper for writing records without cloning the event.
#[derive(Serialize)]
struct JournalRecordRef<'a> {
    seq: u64,
    timestamp: &'a str,
    #[serde(flatten)]
    event: &'a Event,
}

fn verify_contiguous(records: &[JournalRecord]) -> Result<(), JournalError> {
    for (i, record) in records.iter().enumerate() {
        let expected = i as u64 + 1;
        if record.seq != expected {
            return Err(JournalError::SeqGap {
                expected,
                found: record.seq,
            });
        }
    }
    Ok(())
}

fn validate_file_name(path: &Path) -> Result<(), JournalError> {
    let found = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if found != JOURNAL_FILE_NAME {
        return Err(JournalError::BadFileName { found });
    }
    Ok(())
}

/// Reject files that a non-cooperating editor rewrote.
///
/// Checks the head of the file only; a journal is valid iff every line is a
/// complete compact object, so indentation or an opening bracket in the head
/// is proof of reformatting.
fn validate_format(path: &Path) -> Result<(), JournalError> {
    let head = read_head(path, FORMAT_CHECK_HEAD)?;
    let text = String::from_utf8_lossy(&head);

    match text.trim_start().chars().next() {
        None => return Ok(()), // empty file
        Some('[') => return Err(JournalError::ArrayFormat),
        _ => {}
    }

    // Indented continuation lines never occur in compact JSONL.
    if text.contains("\n  ") || text.contains("\n\t") {
        return Err(JournalError::PrettyPrinted);
    }

    // A first line that does not close its object means the record was
    // spread across lines.
    if let Some(first_line) = text.lines().next() {
        let trimmed = first_line.trim();
        if (text.contains('\n') || head.len() < FORMAT_CHECK_HEAD)
            && !trimmed.is_empty()
            && !trimmed.ends_with('}')
        {
            return Err(JournalError::PrettyPrinted);
        }
    }

    Ok(())
}

fn read_head(path: &Path, max: usize) -> Result<Vec<u8>, JournalError> {
    use std::io::Read;
    let file = File::open(path)?;
    let mut buf = Vec::with_capacity(max);
    file.take(max as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
