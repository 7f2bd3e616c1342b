// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-level errors.
//!
//! Tool failures, hook failures under `warn`, and composition warnings never
//! reach this type; they become journal events. What is left is fatal for
//! the invocation.

use delta_core::LifecyclePoint;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] delta_config::ConfigError),

    #[error(transparent)]
    Journal(#[from] delta_journal::JournalError),

    #[error(transparent)]
    Run(#[from] delta_journal::RunError),

    /// Covers audit and interaction-file writes; both gate journal events,
    /// so losing one is fatal.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("LLM transport failed: {0}")]
    Llm(#[from] delta_adapters::LlmError),

    #[error(transparent)]
    Compose(#[from] crate::compose::ComposeError),

    #[error("hook at {point} failed with abort policy: {message}")]
    HookAborted {
        point: LifecyclePoint,
        message: String,
    },

    #[error("session error: {0}")]
    Session(#[from] delta_sessions::SessionError),
}
