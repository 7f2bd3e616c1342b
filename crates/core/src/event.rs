// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types for the Delta Engine journal.
//!
//! Events are the atomic unit of a run's history. The set is closed: every
//! state a run can be in is derivable from these variants plus workspace
//! files, and nothing else.
//!
//! Serializes with `{"type": "EVENT_NAME", "payload": {...}}` framing; the
//! journal wraps that in `{"seq": N, "timestamp": "...", ...}`.

use crate::id::CallId;
use crate::message::ToolCallRequest;
use crate::metadata::RunStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Input widget the built-in `ask_human` tool should present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    #[default]
    Text,
    Password,
    Confirmation,
}

/// Lifecycle point a hook is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePoint {
    PreLlmRequest,
    PostLlmResponse,
    PreToolExec,
    PostToolExec,
    OnError,
}

impl LifecyclePoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecyclePoint::PreLlmRequest => "pre_llm_request",
            LifecyclePoint::PostLlmResponse => "post_llm_response",
            LifecyclePoint::PreToolExec => "pre_tool_exec",
            LifecyclePoint::PostToolExec => "post_tool_exec",
            LifecyclePoint::OnError => "on_error",
        }
    }
}

impl std::fmt::Display for LifecyclePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Events recorded in the append-only journal.
///
/// Serializes with `{"type": "RUN_START", "payload": {...}}` format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    /// First event of every run.
    #[serde(rename = "RUN_START")]
    RunStart {
        run_id: String,
        agent_path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task: Option<String>,
        /// SHA-256 of the agent configuration file.
        #[serde(default)]
        config_hash: String,
    },

    #[serde(rename = "USER_MESSAGE")]
    UserMessage { content: String },

    /// Non-cacheable system-side addition (composition warnings, resume
    /// notices). Rebuilt as a system message.
    #[serde(rename = "SYSTEM_MESSAGE")]
    SystemMessage { content: String },

    /// One LLM reply. May carry tool calls; each call's `call_id` reappears
    /// in exactly one `ACTION_REQUEST`.
    #[serde(rename = "THOUGHT")]
    Thought {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },

    /// One per tool call, in the order the LLM returned them.
    #[serde(rename = "ACTION_REQUEST")]
    ActionRequest {
        call_id: CallId,
        tool: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        args: BTreeMap<String, String>,
    },

    /// Outcome of one tool call. An unmatched `ACTION_REQUEST` at read time
    /// means the prior run was interrupted mid-action.
    #[serde(rename = "ACTION_RESULT")]
    ActionResult {
        call_id: CallId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        #[serde(default)]
        stdout: String,
        #[serde(default)]
        stderr: String,
        #[serde(default)]
        duration_ms: u64,
        /// Set when stdout or stderr hit the capture cap.
        #[serde(default, skip_serializing_if = "is_false")]
        truncated: bool,
        /// Set when the call never produced a child exit: rejection,
        /// timeout, spawn failure, or engine restart.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    #[serde(rename = "HOOK_EXECUTED")]
    HookExecuted {
        point: LifecyclePoint,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        duration_ms: u64,
        /// Combined output, truncated to the journal bound.
        #[serde(default)]
        output: String,
        #[serde(default, skip_serializing_if = "is_false")]
        timed_out: bool,
    },

    /// An async `ask_human` call parked the run.
    #[serde(rename = "INTERACTION_REQUESTED")]
    InteractionRequested {
        call_id: CallId,
        prompt: String,
        #[serde(default)]
        input_type: InputType,
        #[serde(default, skip_serializing_if = "is_false")]
        sensitive: bool,
    },

    /// The user's answer was picked up on a subsequent invocation.
    #[serde(rename = "INTERACTION_RESOLVED")]
    InteractionResolved { call_id: CallId },

    /// Terminal event. `status` is never `running`.
    #[serde(rename = "RUN_END")]
    RunEnd {
        status: RunStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl Event {
    /// The wire discriminant, e.g. `"THOUGHT"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::RunStart { .. } => "RUN_START",
            Event::UserMessage { .. } => "USER_MESSAGE",
            Event::SystemMessage { .. } => "SYSTEM_MESSAGE",
            Event::Thought { .. } => "THOUGHT",
            Event::ActionRequest { .. } => "ACTION_REQUEST",
            Event::ActionResult { .. } => "ACTION_RESULT",
            Event::HookExecuted { .. } => "HOOK_EXECUTED",
            Event::InteractionRequested { .. } => "INTERACTION_REQUESTED",
            Event::InteractionResolved { .. } => "INTERACTION_RESOLVED",
            Event::RunEnd { .. } => "RUN_END",
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
