// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle hook configuration.

use delta_core::LifecyclePoint;
use serde::{Deserialize, Serialize};

/// Default hook timeout (5 s).
pub const DEFAULT_HOOK_TIMEOUT_MS: u64 = 5_000;

/// Policy when a hook exits non-zero or times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnFailure {
    /// Record the observation and continue.
    #[default]
    Warn,
    /// Abort the run.
    Abort,
}

/// One external hook command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookDef {
    pub command: Vec<String>,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub on_failure: OnFailure,
}

fn default_timeout() -> u64 {
    DEFAULT_HOOK_TIMEOUT_MS
}

/// Hooks per lifecycle point. Each point accepts any number of hooks,
/// executed in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HooksConfig {
    #[serde(default)]
    pub pre_llm_request: Vec<HookDef>,
    #[serde(default)]
    pub post_llm_response: Vec<HookDef>,
    #[serde(default)]
    pub pre_tool_exec: Vec<HookDef>,
    #[serde(default)]
    pub post_tool_exec: Vec<HookDef>,
    #[serde(default)]
    pub on_error: Vec<HookDef>,
}

impl HooksConfig {
    pub fn for_point(&self, point: LifecyclePoint) -> &[HookDef] {
        match point {
            LifecyclePoint::PreLlmRequest => &self.pre_llm_request,
            LifecyclePoint::PostLlmResponse => &self.post_llm_response,
            LifecyclePoint::PreToolExec => &self.pre_tool_exec,
            LifecyclePoint::PostToolExec => &self.post_tool_exec,
            LifecyclePoint::OnError => &self.on_error,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pre_llm_request.is_empty()
            && self.post_llm_response.is_empty()
            && self.pre_tool_exec.is_empty()
            && self.post_tool_exec.is_empty()
            && self.on_error.is_empty()
    }
}

#[cfg(test)]
#[path = "hooks_tests.rs"]
mod tests;
