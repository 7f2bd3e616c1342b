// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent and tool definitions.

use crate::context::ContextConfig;
use crate::hooks::HooksConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tool names owned by the engine itself. Agent configs may not redefine
/// them.
pub const RESERVED_TOOL_NAMES: &[&str] =
    &["ask_human", "session_start", "session_exec", "session_end"];

/// How a bound parameter value reaches the child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectAs {
    /// Appended to argv in declaration order.
    #[default]
    Argument,
    /// Contributes a `(flag, value)` pair to argv in declaration order.
    Option,
    /// Becomes the child's standard input. At most one per tool.
    Stdin,
}

/// One declared tool parameter.
///
/// `type` is the literal string `"string"`; every value crosses the boundary
/// as a byte string and the tool owns any numeric or boolean parsing. A
/// future widening must preserve string acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    #[serde(rename = "type", default = "default_param_type")]
    pub param_type: String,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub inject_as: InjectAs,
    /// Flag spelling for `inject_as: option` (e.g. `--depth`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_param_type() -> String {
    "string".to_string()
}

fn default_true() -> bool {
    true
}

/// One external command the LLM may call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    /// Argv template; parameters are injected after these elements.
    pub command: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<ParamDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Per-call timeout override. Absent means the agent-level default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ToolDef {
    pub fn stdin_param(&self) -> Option<&ParamDef> {
        self.parameters
            .iter()
            .find(|p| p.inject_as == InjectAs::Stdin)
    }
}

/// The whole agent definition (`agent.yaml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// T-A-O iteration cap; the counter is derived from journal events.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default)]
    pub tools: Vec<ToolDef>,
    #[serde(default)]
    pub hooks: HooksConfig,
    #[serde(default)]
    pub context: ContextConfig,
    /// Declared child environment; tools see nothing else beyond
    /// `CWD` and `AGENT_HOME`.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Default per-tool-call timeout. Absent means no timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_timeout_ms: Option<u64>,
    /// Capture cap per stream for tool stdout/stderr.
    #[serde(default = "default_output_cap")]
    pub output_cap_bytes: usize,
}

fn default_max_iterations() -> u32 {
    30
}

fn default_output_cap() -> usize {
    1024 * 1024
}

impl AgentConfig {
    pub fn tool(&self, name: &str) -> Option<&ToolDef> {
        self.tools.iter().find(|t| t.name == name)
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
