// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event builders shared by this crate's tests and, via the `test-support`
//! feature, by other crates' tests.

#![allow(clippy::unwrap_used)]

use crate::event::Event;
use crate::id::CallId;
use crate::message::ToolCallRequest;
use crate::metadata::RunStatus;
use std::collections::BTreeMap;

pub fn run_start_event(run_id: &str, agent_path: &str) -> Event {
    Event::RunStart {
        run_id: run_id.to_string(),
        agent_path: agent_path.into(),
        task: Some("test task".to_string()),
        config_hash: String::new(),
    }
}

pub fn user_message_event(content: &str) -> Event {
    Event::UserMessage {
        content: content.to_string(),
    }
}

pub fn thought_event(content: &str) -> Event {
    Event::Thought {
        content: Some(content.to_string()),
        tool_calls: Vec::new(),
    }
}

pub fn thought_with_calls(content: &str, calls: Vec<ToolCallRequest>) -> Event {
    Event::Thought {
        content: Some(content.to_string()),
        tool_calls: calls,
    }
}

pub fn tool_call(call_id: &str, name: &str, args: &[(&str, &str)]) -> ToolCallRequest {
    ToolCallRequest {
        call_id: CallId::new(call_id),
        name: name.to_string(),
        arguments: args
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

pub fn action_request_event(call_id: &str, tool: &str, args: &[(&str, &str)]) -> Event {
    Event::ActionRequest {
        call_id: CallId::new(call_id),
        tool: tool.to_string(),
        args: args
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
    }
}

pub fn action_result_event(call_id: &str, exit_code: i32, stdout: &str) -> Event {
    Event::ActionResult {
        call_id: CallId::new(call_id),
        exit_code: Some(exit_code),
        stdout: stdout.to_string(),
        stderr: String::new(),
        duration_ms: 1,
        truncated: false,
        error: None,
    }
}

pub fn run_end_event(status: RunStatus) -> Event {
    Event::RunEnd {
        status,
        error: None,
    }
}
