// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Post-parse validation of agent configurations.

use crate::agent::{AgentConfig, InjectAs, ToolDef, RESERVED_TOOL_NAMES};
use crate::context::ContextSource;
use std::collections::HashSet;
use thiserror::Error;

/// Configuration errors. All are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("agent config not found at {0}")]
    NotFound(std::path::PathBuf),

    #[error("failed to read agent config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid YAML in agent config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("agent name must not be empty")]
    EmptyAgentName,

    #[error("duplicate tool name: {0}")]
    DuplicateTool(String),

    #[error("tool '{0}' shadows a built-in tool")]
    ReservedTool(String),

    #[error("tool '{0}' has an empty command")]
    EmptyCommand(String),

    #[error("tool '{tool}' parameter '{param}' has type '{declared}'; only \"string\" is accepted")]
    NonStringParam {
        tool: String,
        param: String,
        declared: String,
    },

    #[error("tool '{tool}' has duplicate parameter '{param}'")]
    DuplicateParam { tool: String, param: String },

    #[error("tool '{0}' declares more than one stdin parameter")]
    MultipleStdin(String),

    #[error("tool '{tool}' parameter '{param}' is an option but has no option_name")]
    MissingOptionName { tool: String, param: String },

    #[error("tool '{tool}' parameter '{param}' option_name must start with '-'")]
    BadOptionName { tool: String, param: String },

    #[error("max_iterations must be at least 1")]
    ZeroIterations,

    #[error("computed context source has an empty command")]
    EmptyGeneratorCommand,

    #[error("hook for '{0}' has an empty command")]
    EmptyHookCommand(String),
}

/// Validate everything serde cannot express.
pub fn validate(config: &AgentConfig) -> Result<(), ConfigError> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::EmptyAgentName);
    }
    if config.max_iterations == 0 {
        return Err(ConfigError::ZeroIterations);
    }

    let mut seen = HashSet::new();
    for tool in &config.tools {
        if RESERVED_TOOL_NAMES.contains(&tool.name.as_str()) {
            return Err(ConfigError::ReservedTool(tool.name.clone()));
        }
        if !seen.insert(tool.name.as_str()) {
            return Err(ConfigError::DuplicateTool(tool.name.clone()));
        }
        validate_tool(tool)?;
    }

    for source in &config.context.sources {
        if let ContextSource::Computed { command, .. } = source {
            if command.is_empty() {
                return Err(ConfigError::EmptyGeneratorCommand);
            }
        }
    }

    for point in [
        delta_core::LifecyclePoint::PreLlmRequest,
        delta_core::LifecyclePoint::PostLlmResponse,
        delta_core::LifecyclePoint::PreToolExec,
        delta_core::LifecyclePoint::PostToolExec,
        delta_core::LifecyclePoint::OnError,
    ] {
        for hook in config.hooks.for_point(point) {
            if hook.command.is_empty() {
                return Err(ConfigError::EmptyHookCommand(point.as_str().to_string()));
            }
        }
    }

    Ok(())
}

fn validate_tool(tool: &ToolDef) -> Result<(), ConfigError> {
    if tool.command.is_empty() {
        return Err(ConfigError::EmptyCommand(tool.name.clone()));
    }

    let mut param_names = HashSet::new();
    let mut stdin_count = 0usize;

    for param in &tool.parameters {
        if param.param_type != "string" {
            return Err(ConfigError::NonStringParam {
                tool: tool.name.clone(),
                param: param.name.clone(),
                declared: param.param_type.clone(),
            });
        }
        if !param_names.insert(param.name.as_str()) {
            return Err(ConfigError::DuplicateParam {
                tool: tool.name.clone(),
                param: param.name.clone(),
            });
        }
        match param.inject_as {
            InjectAs::Stdin => {
                stdin_count += 1;
                if stdin_count > 1 {
                    return Err(ConfigError::MultipleStdin(tool.name.clone()));
                }
            }
            InjectAs::Option => match &param.option_name {
                None => {
                    return Err(ConfigError::MissingOptionName {
                        tool: tool.name.clone(),
                        param: param.name.clone(),
                    })
                }
                Some(flag) if !flag.starts_with('-') => {
                    return Err(ConfigError::BadOptionName {
                        tool: tool.name.clone(),
                        param: param.name.clone(),
                    })
                }
                Some(_) => {}
            },
            InjectAs::Argument => {}
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
