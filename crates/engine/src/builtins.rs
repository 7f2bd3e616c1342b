// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in tools the engine serves itself.
//!
//! `ask_human` routes to the interaction subsystem; the `session_*` tools
//! route to the session manager. Built-ins are always offered alongside the
//! agent's configured tools.

use delta_adapters::{ToolSchema, ToolSchemaParam};

/// Names the engine intercepts before tool lookup.
pub fn is_builtin_tool(name: &str) -> bool {
    delta_config::RESERVED_TOOL_NAMES.contains(&name)
}

/// Schemas for the built-in tools, appended to every LLM request.
pub fn builtin_tool_schemas() -> Vec<ToolSchema> {
    vec![
        ToolSchema {
            name: "ask_human".to_string(),
            description: Some(
                "Ask the human operator a question and wait for their answer".to_string(),
            ),
            parameters: vec![
                param("prompt", true, "The question to ask"),
                param(
                    "input_type",
                    false,
                    "One of: text (default), password, confirmation",
                ),
                param("sensitive", false, "Set to \"true\" to mask the input"),
            ],
        },
        ToolSchema {
            name: "session_start".to_string(),
            description: Some(
                "Start a persistent interactive session (e.g. a shell); returns its session_id"
                    .to_string(),
            ),
            parameters: vec![
                param("command", true, "Program to run, e.g. \"bash\""),
                param("cwd", false, "Working directory (defaults to the workspace)"),
            ],
        },
        ToolSchema {
            name: "session_exec".to_string(),
            description: Some(
                "Run a command in an existing session and return its output".to_string(),
            ),
            parameters: vec![
                param("session_id", true, "Session to target"),
                param("command", true, "Command line to run"),
                param("timeout_ms", false, "Per-command timeout in milliseconds"),
            ],
        },
        ToolSchema {
            name: "session_end".to_string(),
            description: Some("Terminate a session".to_string()),
            parameters: vec![param("session_id", true, "Session to terminate")],
        },
    ]
}

fn param(name: &str, required: bool, description: &str) -> ToolSchemaParam {
    ToolSchemaParam {
        name: name.to_string(),
        required,
        description: Some(description.to_string()),
    }
}

#[cfg(test)]
#[path = "builtins_tests.rs"]
mod tests;
