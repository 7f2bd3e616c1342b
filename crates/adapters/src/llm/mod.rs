// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LLM transport boundary.
//!
//! One request per T-A-O iteration: the composed system document, the
//! (possibly folded) conversation, and the tool schemas. Retries, token
//! accounting, and provider wire formats are the transport's concern.

mod replay;

pub use replay::ReplayAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeLlmAdapter;

use async_trait::async_trait;
use delta_core::{ChatMessage, ToolCallRequest};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from LLM transports
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("replay script exhausted at iteration {0}")]
    ReplayExhausted(u32),

    #[error("invalid replay script: {0}")]
    ReplayScript(String),
}

/// Schema of one callable tool, as presented to the LLM.
///
/// Parameters are all string-typed by contract; only names, requiredness,
/// and descriptions vary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ToolSchemaParam>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSchemaParam {
    pub name: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The composed context document.
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSchema>,
    /// Zero-based T-A-O iteration index, derived from the journal. Lets
    /// deterministic adapters stay aligned across process restarts.
    pub iteration: u32,
}

/// One completion reply.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
}

/// Adapter for LLM completion transports.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError>;
}

#[async_trait]
impl LlmAdapter for Box<dyn LlmAdapter> {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        (**self).complete(request).await
    }
}
