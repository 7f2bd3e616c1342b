// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The built-in `ask_human` tool.
//!
//! Synchronous mode reads one line from the controlling terminal (echo off
//! for sensitive input). Asynchronous mode parks the run: the request goes
//! to `interaction/request.json`, the process exits with the reserved
//! waiting-for-input code, and a later invocation picks the answer up from
//! `interaction/response.txt`. Either way the LLM sees one tool call and
//! one tool result.

use delta_core::{CallId, InputType};
use delta_journal::RunPaths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

/// Parsed arguments of one `ask_human` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskHumanArgs {
    pub prompt: String,
    pub input_type: InputType,
    pub sensitive: bool,
}

impl AskHumanArgs {
    /// Parse from the string-typed argument map; failures are call
    /// rejections, not engine errors.
    pub fn parse(args: &BTreeMap<String, String>) -> Result<Self, String> {
        let prompt = args
            .get("prompt")
            .filter(|p| !p.is_empty())
            .ok_or("ask_human requires a 'prompt' parameter")?
            .clone();

        let input_type = match args.get("input_type").map(String::as_str) {
            None | Some("text") => InputType::Text,
            Some("password") => InputType::Password,
            Some("confirmation") => InputType::Confirmation,
            Some(other) => {
                return Err(format!(
                    "invalid input_type '{}': expected text, password, or confirmation",
                    other
                ))
            }
        };

        let sensitive = match args.get("sensitive").map(String::as_str) {
            None | Some("false") => false,
            Some("true") => true,
            Some(other) => return Err(format!("invalid sensitive '{}': expected true or false", other)),
        };

        Ok(Self {
            prompt,
            input_type,
            sensitive,
        })
    }

    pub fn masked(&self) -> bool {
        self.sensitive || self.input_type == InputType::Password
    }
}

/// The `interaction/request.json` record a parked run leaves behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRequest {
    pub call_id: CallId,
    pub prompt: String,
    pub input_type: InputType,
    pub sensitive: bool,
    pub requested_at: String,
}

impl InteractionRequest {
    pub fn write(&self, paths: &RunPaths) -> io::Result<()> {
        std::fs::create_dir_all(paths.interaction_dir())?;
        let mut bytes = serde_json::to_vec_pretty(self).map_err(io::Error::other)?;
        bytes.push(b'\n');
        std::fs::write(paths.interaction_request_path(), bytes)
    }

    pub fn read(paths: &RunPaths) -> io::Result<Option<Self>> {
        match std::fs::read(paths.interaction_request_path()) {
            Ok(raw) => Ok(Some(
                serde_json::from_slice(&raw).map_err(io::Error::other)?,
            )),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// The user's answer, once `interaction/response.txt` exists.
pub fn read_response(paths: &RunPaths) -> io::Result<Option<String>> {
    match std::fs::read_to_string(paths.interaction_response_path()) {
        Ok(content) => Ok(Some(
            content.strip_suffix('\n').unwrap_or(&content).to_string(),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Remove the interaction files after the answer is journaled.
pub fn clear(paths: &RunPaths) -> io::Result<()> {
    match std::fs::remove_dir_all(paths.interaction_dir()) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Synchronous mode: prompt on the terminal and read one line.
///
/// `assume_yes` answers confirmations without prompting. Masked input
/// disables terminal echo for the read when stdin is a terminal.
pub fn prompt_terminal(args: &AskHumanArgs, assume_yes: bool) -> io::Result<String> {
    if args.input_type == InputType::Confirmation && assume_yes {
        return Ok("yes".to_string());
    }

    let mut stderr = io::stderr();
    write!(stderr, "{}: ", args.prompt)?;
    stderr.flush()?;

    let answer = if args.masked() {
        read_line_masked()?
    } else {
        read_line()?
    };

    Ok(answer)
}

fn read_line() -> io::Result<String> {
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Read a line with terminal echo disabled, restoring the previous terminal
/// state before returning on every path.
fn read_line_masked() -> io::Result<String> {
    use nix::sys::termios::{tcgetattr, tcsetattr, LocalFlags, SetArg};
    use std::os::fd::AsFd;

    let stdin = io::stdin();
    let Ok(original) = tcgetattr(stdin.as_fd()) else {
        // Not a terminal (piped input); nothing to mask.
        return read_line();
    };

    let mut quiet = original.clone();
    quiet.local_flags.remove(LocalFlags::ECHO);
    tcsetattr(stdin.as_fd(), SetArg::TCSANOW, &quiet).map_err(io::Error::other)?;

    let result = read_line();

    let _ = tcsetattr(stdin.as_fd(), SetArg::TCSANOW, &original);
    let _ = writeln!(io::stderr());

    result
}

#[cfg(test)]
#[path = "interaction_tests.rs"]
mod tests;
