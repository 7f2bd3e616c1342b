// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Context composition configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default timeout for computed-file generators (10 s).
pub const DEFAULT_GENERATOR_TIMEOUT_MS: u64 = 10_000;

/// Policy when a computed source fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFailure {
    /// Drop the source and surface a `SYSTEM_MESSAGE`.
    #[default]
    Skip,
    /// Abort the iteration.
    Fatal,
}

/// One source of the composed context, concatenated in declared order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContextSource {
    /// Fixed file relative to the agent directory. Missing is fatal unless
    /// marked optional.
    Static {
        path: PathBuf,
        #[serde(default)]
        optional: bool,
    },

    /// External generator run in the workspace; stdout is captured to
    /// `output` under `.delta/context_artifacts/` and included. Enables
    /// memory folding: the generator reads the journal and emits a summary.
    Computed {
        command: Vec<String>,
        output: PathBuf,
        #[serde(default = "default_generator_timeout")]
        timeout_ms: u64,
        /// Byte budget is derived from this (4 bytes per token).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_tokens: Option<usize>,
        #[serde(default)]
        on_failure: SourceFailure,
    },

    /// Workspace file loaded when present.
    File {
        path: PathBuf,
        #[serde(default = "default_true")]
        if_exists: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_bytes: Option<usize>,
    },

    /// The last N iterations of conversational events, verbatim.
    JournalTail {
        #[serde(default = "default_tail_iterations")]
        iterations: usize,
    },
}

fn default_generator_timeout() -> u64 {
    DEFAULT_GENERATOR_TIMEOUT_MS
}

fn default_tail_iterations() -> usize {
    5
}

fn default_true() -> bool {
    true
}

/// Ordered context sources for an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    pub sources: Vec<ContextSource>,
}

impl Default for ContextConfig {
    /// System prompt plus a five-iteration journal tail.
    fn default() -> Self {
        Self {
            sources: vec![
                ContextSource::Static {
                    path: PathBuf::from("system_prompt.md"),
                    optional: false,
                },
                ContextSource::JournalTail { iterations: 5 },
            ],
        }
    }
}

impl ContextConfig {
    pub fn journal_tail_iterations(&self) -> Option<usize> {
        self.sources.iter().find_map(|s| match s {
            ContextSource::JournalTail { iterations } => Some(*iterations),
            _ => None,
        })
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
