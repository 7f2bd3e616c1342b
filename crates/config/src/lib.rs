// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Agent configuration parsing and validation.
//!
//! Agents are defined by a YAML file (`agent.yaml`) in the agent directory.
//! Parsing is plain serde; everything that serde cannot express (unique tool
//! names, the string-typed-only parameter contract, stdin cardinality) is
//! checked in a separate validation pass so error messages can name the
//! offending tool.

mod agent;
mod context;
mod hooks;
mod load;
mod validate;

pub use agent::{AgentConfig, InjectAs, ParamDef, ToolDef, RESERVED_TOOL_NAMES};
pub use context::{ContextConfig, ContextSource, SourceFailure, DEFAULT_GENERATOR_TIMEOUT_MS};
pub use hooks::{HookDef, HooksConfig, OnFailure, DEFAULT_HOOK_TIMEOUT_MS};
pub use load::{load_agent, LoadedAgent};
pub use validate::{validate, ConfigError};
