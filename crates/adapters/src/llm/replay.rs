// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic replay adapter.
//!
//! Reads a JSONL script of canned [`ChatResponse`] values and serves line N
//! for iteration N. Because the index comes from the request (derived from
//! the journal) rather than internal state, a resumed run picks up exactly
//! where the previous process stopped.

use super::{ChatRequest, ChatResponse, LlmAdapter, LlmError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Replay adapter over a JSONL script file.
#[derive(Debug, Clone)]
pub struct ReplayAdapter {
    script: Vec<ChatResponse>,
    path: PathBuf,
}

impl ReplayAdapter {
    /// Load the script eagerly so malformed lines fail at startup, not mid-run.
    pub fn load(path: &Path) -> Result<Self, LlmError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| LlmError::ReplayScript(format!("{}: {}", path.display(), e)))?;

        let mut script = Vec::new();
        for (i, line) in raw.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let response: ChatResponse = serde_json::from_str(trimmed)
                .map_err(|e| LlmError::ReplayScript(format!("line {}: {}", i + 1, e)))?;
            script.push(response);
        }

        Ok(Self {
            script,
            path: path.to_path_buf(),
        })
    }

    pub fn len(&self) -> usize {
        self.script.len()
    }

    pub fn is_empty(&self) -> bool {
        self.script.is_empty()
    }
}

#[async_trait]
impl LlmAdapter for ReplayAdapter {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        let index = request.iteration as usize;
        let response = self
            .script
            .get(index)
            .ok_or(LlmError::ReplayExhausted(request.iteration))?;

        tracing::debug!(
            script = %self.path.display(),
            iteration = request.iteration,
            "replaying canned response"
        );
        Ok(response.clone())
    }
}

#[cfg(test)]
#[path = "replay_tests.rs"]
mod tests;
