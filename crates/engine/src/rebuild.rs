// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conversation reconstruction.
//!
//! Pure functions from ordered journal records to the LLM's view of the
//! world. Rebuilding twice from the same journal yields identical output;
//! there is no other source of conversational state.

use delta_core::{CallId, ChatMessage, Event, RunStatus};
use delta_journal::JournalRecord;

/// Tool-result text for a request whose result never arrived: the prior
/// process died mid-action.
pub const INTERRUPTED_RESULT: &str =
    "action interrupted: the engine was stopped before this call produced a result";

/// Rebuild the message sequence from ordered events.
///
/// Mapping: `USER_MESSAGE` → user, `SYSTEM_MESSAGE` → system, `THOUGHT` →
/// assistant (with tool calls), `ACTION_RESULT` → tool result. Everything
/// else is audit-only. A trailing `ACTION_REQUEST` with no result gets a
/// synthetic interrupted result so tool-call pairing stays consistent on
/// resume.
pub fn rebuild_conversation(records: &[JournalRecord]) -> Vec<ChatMessage> {
    let mut messages = Vec::new();
    let mut pending: Vec<CallId> = Vec::new();

    for record in records {
        match &record.event {
            Event::UserMessage { content } => messages.push(ChatMessage::user(content.clone())),
            Event::SystemMessage { content } => messages.push(ChatMessage::system(content.clone())),
            Event::Thought {
                content,
                tool_calls,
            } => {
                messages.push(ChatMessage::assistant(
                    content.clone().unwrap_or_default(),
                    tool_calls.clone(),
                ));
            }
            Event::ActionRequest { call_id, .. } => pending.push(call_id.clone()),
            Event::ActionResult { call_id, .. } => {
                pending.retain(|id| id != call_id);
                messages.push(ChatMessage::tool_result(
                    call_id.clone(),
                    render_action_result(&record.event),
                ));
            }
            _ => {}
        }
    }

    for call_id in pending {
        messages.push(ChatMessage::tool_result(call_id, INTERRUPTED_RESULT));
    }

    messages
}

/// Render an `ACTION_RESULT` payload as tool-result text.
pub fn render_action_result(event: &Event) -> String {
    let Event::ActionResult {
        exit_code,
        stdout,
        stderr,
        truncated,
        error,
        ..
    } = event
    else {
        return String::new();
    };

    if let Some(error) = error {
        return format!("error: {}", error);
    }

    let mut out = stdout.clone();
    if !stderr.is_empty() {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("[stderr]\n");
        out.push_str(stderr);
    }
    match exit_code {
        Some(0) | None => {}
        Some(code) => {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&format!("[exit code: {}]", code));
        }
    }
    if *truncated {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("[output truncated]");
    }
    out
}

/// Number of completed LLM calls, the loop's iteration counter.
pub fn iteration_count(records: &[JournalRecord]) -> u32 {
    records
        .iter()
        .filter(|r| matches!(r.event, Event::Thought { .. }))
        .count() as u32
}

/// `ACTION_REQUEST`s with no matching `ACTION_RESULT`, in request order.
pub fn pending_requests(records: &[JournalRecord]) -> Vec<(CallId, String)> {
    let mut pending: Vec<(CallId, String)> = Vec::new();
    for record in records {
        match &record.event {
            Event::ActionRequest { call_id, tool, .. } => {
                pending.push((call_id.clone(), tool.clone()));
            }
            Event::ActionResult { call_id, .. } => {
                pending.retain(|(id, _)| id != call_id);
            }
            _ => {}
        }
    }
    pending
}

/// The interaction a parked run is waiting on, if any.
pub fn pending_interaction(records: &[JournalRecord]) -> Option<&JournalRecord> {
    let mut open: Option<&JournalRecord> = None;
    for record in records {
        match &record.event {
            Event::InteractionRequested { .. } => open = Some(record),
            Event::InteractionResolved { .. } => open = None,
            _ => {}
        }
    }
    open
}

/// Status of the last `RUN_END`, when the run has one.
pub fn terminal_status(records: &[JournalRecord]) -> Option<RunStatus> {
    records.iter().rev().find_map(|r| match &r.event {
        Event::RunEnd { status, .. } => Some(*status),
        _ => None,
    })
}

/// The conversational tail covering the last `iterations` THOUGHT cycles.
///
/// The first `USER_MESSAGE` (the task) is always retained, so a folded
/// context never loses the goal statement.
pub fn tail_conversation(records: &[JournalRecord], iterations: usize) -> Vec<ChatMessage> {
    let thought_seqs: Vec<u64> = records
        .iter()
        .filter(|r| matches!(r.event, Event::Thought { .. }))
        .map(|r| r.seq)
        .collect();

    if thought_seqs.len() <= iterations {
        return rebuild_conversation(records);
    }

    let boundary = thought_seqs[thought_seqs.len() - iterations];
    let mut kept: Vec<JournalRecord> = Vec::new();

    if let Some(first_user) = records
        .iter()
        .find(|r| matches!(r.event, Event::UserMessage { .. }))
    {
        if first_user.seq < boundary {
            kept.push(first_user.clone());
        }
    }
    kept.extend(records.iter().filter(|r| r.seq >= boundary).cloned());

    rebuild_conversation(&kept)
}

#[cfg(test)]
#[path = "rebuild_tests.rs"]
mod tests;
