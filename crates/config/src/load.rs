// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loading agent definitions from disk.

use crate::agent::AgentConfig;
use crate::validate::{validate, ConfigError};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Candidate config file names, tried in order.
const CONFIG_NAMES: &[&str] = &["agent.yaml", "agent.yml"];

/// A parsed, validated agent plus its provenance.
#[derive(Debug, Clone)]
pub struct LoadedAgent {
    pub config: AgentConfig,
    /// Directory holding `agent.yaml` and the static context files.
    pub agent_dir: PathBuf,
    /// SHA-256 of the raw config bytes, recorded in `RUN_START`.
    pub config_hash: String,
}

/// Load and validate the agent definition under `agent_dir`.
pub fn load_agent(agent_dir: &Path) -> Result<LoadedAgent, ConfigError> {
    let path = CONFIG_NAMES
        .iter()
        .map(|name| agent_dir.join(name))
        .find(|p| p.is_file())
        .ok_or_else(|| ConfigError::NotFound(agent_dir.join(CONFIG_NAMES[0])))?;

    let raw = std::fs::read(&path)?;
    let config: AgentConfig = serde_yaml::from_slice(&raw)?;
    validate(&config)?;

    let config_hash = format!("{:x}", Sha256::digest(&raw));
    tracing::debug!(
        agent = %config.name,
        path = %path.display(),
        hash = %config_hash,
        "loaded agent config"
    );

    Ok(LoadedAgent {
        config,
        agent_dir: agent_dir.to_path_buf(),
        config_hash,
    })
}

#[cfg(test)]
#[path = "load_tests.rs"]
mod tests;
