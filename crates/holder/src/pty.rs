// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PTY ownership and command-oriented execution.
//!
//! The holder opens the pseudo-terminal, spawns the session child on its
//! slave side, and keeps a reader thread draining the master into a bounded
//! scrollback buffer. `exec` is sentinel-based: the command is written to
//! the child's shell followed by a `printf` that reveals `$?`, and output is
//! scraped until the expanded sentinel appears. The PTY merges the child's
//! streams, so scraped output is interleaved stdout+stderr.

use parking_lot::Mutex;
use portable_pty::{Child, CommandBuilder, MasterPty, NativePtySystem, PtySize, PtySystem};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Scrollback cap: old output is dropped once the buffer exceeds this.
const SCROLLBACK_CAP: usize = 1024 * 1024;

/// Poll interval while waiting for exec output.
const EXEC_POLL: Duration = Duration::from_millis(20);

/// Default exec deadline when the request does not carry one.
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(60);

/// Shells that accept the sentinel-based exec protocol.
const KNOWN_SHELLS: &[&str] = &["sh", "bash", "zsh", "dash", "ksh"];

/// First input to a shell session: disable echo, empty prompts.
const SHELL_PRIMER: &[u8] = b"stty -echo 2>/dev/null; PS1=; PS2=; unset PROMPT_COMMAND\n";

/// Errors from PTY operations
#[derive(Debug, Error)]
pub enum PtyError {
    #[error("failed to open pty: {0}")]
    Open(String),

    #[error("failed to spawn '{command}': {message}")]
    Spawn { command: String, message: String },

    #[error("write to session failed: {0}")]
    Write(String),

    #[error("exec timed out after {0:?}; the command may still be running")]
    ExecTimeout(Duration),

    #[error("exec requires a shell session; this session runs '{0}' — use write/read instead")]
    NotAShell(String),
}

/// Bounded scrollback with absolute stream offsets.
///
/// Offsets are absolute so exec windows stay valid when the front of the
/// buffer is trimmed.
struct Scrollback {
    data: Vec<u8>,
    /// Absolute offset of `data[0]`.
    base: u64,
    /// Read cursor for the legacy byte-stream API.
    cursor: u64,
}

impl Scrollback {
    fn new() -> Self {
        Self {
            data: Vec::new(),
            base: 0,
            cursor: 0,
        }
    }

    fn push(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
        if self.data.len() > SCROLLBACK_CAP {
            let excess = self.data.len() - SCROLLBACK_CAP;
            self.data.drain(..excess);
            self.base += excess as u64;
        }
    }

    /// Absolute offset one past the last byte.
    fn end(&self) -> u64 {
        self.base + self.data.len() as u64
    }

    fn slice_from(&self, abs: u64) -> &[u8] {
        let start = abs.saturating_sub(self.base) as usize;
        &self.data[start.min(self.data.len())..]
    }

    /// Unread bytes for the legacy read API; advances the cursor.
    fn drain_unread(&mut self) -> Vec<u8> {
        let start = self.cursor.max(self.base);
        let bytes = self.slice_from(start).to_vec();
        self.cursor = self.end();
        bytes
    }

    fn has_unread(&self) -> bool {
        self.cursor.max(self.base) < self.end()
    }
}

/// A child process on a PTY with scraped output.
pub struct PtySession {
    _master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    child: Box<dyn Child + Send>,
    scrollback: Arc<Mutex<Scrollback>>,
    /// Program name the session was started with.
    program: String,
    /// True when the session command is a known shell (enables exec).
    is_shell: bool,
    /// Monotonic nonce for exec sentinels.
    next_nonce: u64,
    /// Exit code observed by `try_wait`, sticky once seen.
    exit_code: Option<i32>,
}

impl PtySession {
    /// Open a PTY, spawn `command` on it, and start the reader thread.
    ///
    /// For known shells the session is primed with `stty -echo` and an empty
    /// prompt so scraped output holds only what commands print.
    pub fn spawn(command: &[String], cwd: &Path) -> Result<Self, PtyError> {
        let Some(program) = command.first() else {
            return Err(PtyError::Spawn {
                command: String::new(),
                message: "empty command".to_string(),
            });
        };

        let pty_system = NativePtySystem::default();
        let pair = pty_system
            .openpty(PtySize {
                rows: 40,
                cols: 120,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::Open(e.to_string()))?;

        let mut builder = CommandBuilder::new(program);
        builder.args(&command[1..]);
        builder.cwd(cwd);
        builder.env("TERM", "dumb");

        let child = pair
            .slave
            .spawn_command(builder)
            .map_err(|e| PtyError::Spawn {
                command: command.join(" "),
                message: e.to_string(),
            })?;
        // The slave side stays open in the child; drop our copy so EOF
        // propagates when the child exits.
        drop(pair.slave);

        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| PtyError::Open(e.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| PtyError::Open(e.to_string()))?;

        let scrollback = Arc::new(Mutex::new(Scrollback::new()));
        let scrollback_reader = Arc::clone(&scrollback);
        std::thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => scrollback_reader.lock().push(&buf[..n]),
                }
            }
        });

        let is_shell = Path::new(program)
            .file_name()
            .map(|n| KNOWN_SHELLS.contains(&n.to_string_lossy().as_ref()))
            .unwrap_or(false);

        let mut session = Self {
            _master: pair.master,
            writer,
            child,
            scrollback,
            program: program.clone(),
            is_shell,
            next_nonce: 1,
            exit_code: None,
        };

        if is_shell {
            // Quiet the shell: no echo, no prompts. The line itself is
            // echoed once before echo turns off; the settle delay keeps that
            // echo ahead of the first exec window.
            session.write_bytes(SHELL_PRIMER)?;
            std::thread::sleep(Duration::from_millis(200));
        }

        Ok(session)
    }

    pub fn child_pid(&self) -> Option<u32> {
        self.child.process_id()
    }

    /// Child liveness; records the exit code the first time it is observed.
    pub fn try_wait(&mut self) -> Option<i32> {
        if self.exit_code.is_some() {
            return self.exit_code;
        }
        if let Ok(Some(status)) = self.child.try_wait() {
            self.exit_code = Some(status.exit_code() as i32);
        }
        self.exit_code
    }

    pub fn is_alive(&mut self) -> bool {
        self.try_wait().is_none()
    }

    /// Raw write for the legacy byte-stream API.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), PtyError> {
        self.writer
            .write_all(bytes)
            .and_then(|_| self.writer.flush())
            .map_err(|e| PtyError::Write(e.to_string()))
    }

    /// Drain unread output, waiting up to `timeout` for the first byte.
    pub async fn read_output(&mut self, timeout: Duration) -> String {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let mut scrollback = self.scrollback.lock();
                if scrollback.has_unread() {
                    return String::from_utf8_lossy(&scrollback.drain_unread()).into_owned();
                }
            }
            if Instant::now() >= deadline {
                return String::new();
            }
            tokio::time::sleep(EXEC_POLL).await;
        }
    }

    /// Run `command` to completion in the session's shell and return its
    /// output and exit code.
    pub async fn exec(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<(String, i32, u64), PtyError> {
        if !self.is_shell {
            return Err(PtyError::NotAShell(self.program.clone()));
        }

        let nonce = self.next_nonce;
        self.next_nonce += 1;

        let start_offset = self.scrollback.lock().end();
        let started = Instant::now();

        let mut input = String::with_capacity(command.len() + 48);
        input.push_str(command);
        if !command.ends_with('\n') {
            input.push('\n');
        }
        input.push_str(&format!("printf '__delta_done_{nonce}_%d\\n' $?\n"));
        self.write_bytes(input.as_bytes())?;

        let deadline = started + timeout;
        loop {
            {
                let scrollback = self.scrollback.lock();
                let window = scrollback.slice_from(start_offset);
                let text = String::from_utf8_lossy(window);
                if let Some((needle_start, exit_code)) = find_sentinel(&text, nonce) {
                    let stdout = clean_exec_output(&text[..needle_start]);
                    let duration_ms = started.elapsed().as_millis() as u64;
                    return Ok((stdout, exit_code, duration_ms));
                }
            }
            if Instant::now() >= deadline {
                return Err(PtyError::ExecTimeout(timeout));
            }
            tokio::time::sleep(EXEC_POLL).await;
        }
    }

    /// Kill the child. Idempotent; the reader thread exits on EOF.
    pub fn kill(&mut self) {
        if self.is_alive() {
            let _ = self.child.kill();
        }
    }
}

/// Locate the expanded sentinel for `nonce` in `text`.
///
/// Returns the byte offset where the sentinel line starts and the parsed
/// exit code. The echoed command still shows `%d` (not digits), so only the
/// expansion can match.
pub fn find_sentinel(text: &str, nonce: u64) -> Option<(usize, i32)> {
    let needle = format!("__delta_done_{nonce}_");
    let mut search_from = 0usize;

    while let Some(rel) = text[search_from..].find(&needle) {
        let needle_start = search_from + rel;
        let digits_start = needle_start + needle.len();
        let rest = &text[digits_start..];

        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        let after = rest[digits.len()..].chars().next();

        // A line terminator must follow: digits alone may still be a
        // partially-flushed code.
        if !digits.is_empty() && matches!(after, Some('\r') | Some('\n')) {
            if let Ok(code) = digits.parse::<i32>() {
                return Some((needle_start, code));
            }
        }
        search_from = digits_start;
    }

    None
}

/// Normalize CRLF and drop sentinel-bearing lines (and stray primer echo)
/// from scraped output.
///
/// Leading CR/LF is PTY noise: the tail of the previous sentinel line can
/// land after the next exec window opens.
pub fn clean_exec_output(raw: &str) -> String {
    let raw = raw.trim_start_matches(['\r', '\n']);
    let mut out = String::with_capacity(raw.len());
    for line in raw.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);
        if content.contains("__delta_done_") || content.contains("stty -echo") {
            continue;
        }
        out.push_str(content);
        if line.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
#[path = "pty_tests.rs"]
mod tests;
