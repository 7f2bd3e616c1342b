// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! delta-adapters: boundaries to external services.
//!
//! The engine core never talks to a provider directly; it goes through the
//! [`llm::LlmAdapter`] trait. Real HTTP transports live outside this
//! repository and implement the same trait.

pub mod llm;

pub use llm::{
    ChatRequest, ChatResponse, LlmAdapter, LlmError, ReplayAdapter, ToolSchema, ToolSchemaParam,
};

#[cfg(any(test, feature = "test-support"))]
pub use llm::FakeLlmAdapter;
