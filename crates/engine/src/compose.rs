// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Context composition.
//!
//! Assembles the document block sent to the LLM each iteration: static
//! files from the agent directory, computed files from external generators
//! (memory folding), direct workspace includes, and a bounded tail of the
//! journal. Output is deterministic given the same inputs. Only a missing
//! required static source is fatal; every other failure degrades to a
//! warning the caller journals as a `SYSTEM_MESSAGE`.

use crate::rebuild::tail_conversation;
use crate::subprocess::run_with_timeout;
use delta_config::{ContextConfig, ContextSource, SourceFailure};
use delta_core::ChatMessage;
use delta_journal::{JournalRecord, WorkspaceLayout};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::warn;

/// Bytes granted per token when enforcing `max_tokens` budgets.
const BYTES_PER_TOKEN: usize = 4;

/// Marker appended where a source was cut at its byte budget.
const TRUNCATION_MARKER: &str = "\n[truncated]";

/// Errors that abort composition.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("required context file missing: {0}; create it or mark the source optional")]
    MissingStatic(PathBuf),

    #[error("context generator failed: {0}")]
    Generator(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The assembled context for one iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedContext {
    /// Concatenated source documents, in declared order.
    pub system: String,
    /// Recent conversation, verbatim.
    pub messages: Vec<ChatMessage>,
    /// Non-fatal source failures; the engine journals each as a
    /// `SYSTEM_MESSAGE`.
    pub warnings: Vec<String>,
}

/// Composes context from an agent's declared sources.
pub struct Composer<'a> {
    config: &'a ContextConfig,
    agent_dir: &'a Path,
    workspace: &'a WorkspaceLayout,
}

impl<'a> Composer<'a> {
    pub fn new(
        config: &'a ContextConfig,
        agent_dir: &'a Path,
        workspace: &'a WorkspaceLayout,
    ) -> Self {
        Self {
            config,
            agent_dir,
            workspace,
        }
    }

    pub async fn compose(
        &self,
        records: &[JournalRecord],
    ) -> Result<ComposedContext, ComposeError> {
        let mut documents: Vec<String> = Vec::new();
        let mut messages: Vec<ChatMessage> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();

        for source in &self.config.sources {
            match source {
                ContextSource::Static { path, optional } => {
                    let full = self.agent_dir.join(path);
                    match std::fs::read_to_string(&full) {
                        Ok(content) => documents.push(content),
                        Err(_) if *optional => {
                            warn!(path = %full.display(), "optional static source missing");
                        }
                        Err(_) => return Err(ComposeError::MissingStatic(full)),
                    }
                }

                ContextSource::Computed {
                    command,
                    output,
                    timeout_ms,
                    max_tokens,
                    on_failure,
                } => {
                    match self
                        .run_generator(command, output, *timeout_ms, *max_tokens)
                        .await
                    {
                        Ok(content) => documents.push(content),
                        Err(message) => match on_failure {
                            SourceFailure::Fatal => {
                                return Err(ComposeError::Generator(message))
                            }
                            SourceFailure::Skip => {
                                warnings.push(format!("context source skipped: {}", message));
                            }
                        },
                    }
                }

                ContextSource::File {
                    path,
                    if_exists,
                    max_bytes,
                } => {
                    let full = self.workspace.root().join(path);
                    match std::fs::read_to_string(&full) {
                        Ok(content) => {
                            documents.push(truncate_to(content, *max_bytes));
                        }
                        Err(_) if *if_exists => {}
                        Err(e) => {
                            warnings.push(format!(
                                "context file {} unreadable: {}",
                                full.display(),
                                e
                            ));
                        }
                    }
                }

                ContextSource::JournalTail { iterations } => {
                    messages = tail_conversation(records, *iterations);
                }
            }
        }

        Ok(ComposedContext {
            system: documents.join("\n\n"),
            messages,
            warnings,
        })
    }

    /// Run one computed-file generator: capture stdout, persist the
    /// artifact, enforce the byte budget.
    async fn run_generator(
        &self,
        command: &[String],
        output: &Path,
        timeout_ms: u64,
        max_tokens: Option<usize>,
    ) -> Result<String, String> {
        let Some(program) = command.first() else {
            return Err("generator has an empty command".to_string());
        };

        let mut cmd = Command::new(program);
        cmd.args(&command[1..])
            .current_dir(self.workspace.root())
            .stdin(std::process::Stdio::null());

        let description = format!("context generator '{}'", program);
        let result = run_with_timeout(cmd, Duration::from_millis(timeout_ms), &description).await?;

        if !result.status.success() {
            return Err(format!(
                "{} exited with {}: {}",
                description,
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            ));
        }

        let content = truncate_to(
            String::from_utf8_lossy(&result.stdout).into_owned(),
            max_tokens.map(|t| t * BYTES_PER_TOKEN),
        );

        let artifact = self.workspace.context_artifacts_dir().join(output);
        if let Some(parent) = artifact.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        std::fs::write(&artifact, &content).map_err(|e| e.to_string())?;

        Ok(content)
    }
}

/// Cut `content` at a byte budget on a char boundary, appending a marker.
fn truncate_to(content: String, max_bytes: Option<usize>) -> String {
    let Some(max) = max_bytes else {
        return content;
    };
    if content.len() <= max {
        return content;
    }

    let mut cut = max;
    while cut > 0 && !content.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut truncated = content[..cut].to_string();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

#[cfg(test)]
#[path = "compose_tests.rs"]
mod tests;
