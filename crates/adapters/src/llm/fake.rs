// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake LLM adapter for tests: queued responses, recorded requests.

use super::{ChatRequest, ChatResponse, LlmAdapter, LlmError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// In-memory adapter serving queued responses in order.
#[derive(Clone, Default)]
pub struct FakeLlmAdapter {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    queue: VecDeque<Result<ChatResponse, String>>,
    requests: Vec<ChatRequest>,
}

impl FakeLlmAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn push_response(&self, response: ChatResponse) {
        self.inner.lock().queue.push_back(Ok(response));
    }

    /// Queue a transport failure.
    pub fn push_error(&self, message: impl Into<String>) {
        self.inner.lock().queue.push_back(Err(message.into()));
    }

    /// Requests seen so far, in order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.inner.lock().requests.clone()
    }
}

#[async_trait]
impl LlmAdapter for FakeLlmAdapter {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        let mut inner = self.inner.lock();
        inner.requests.push(request.clone());
        match inner.queue.pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(LlmError::Transport(message)),
            None => Err(LlmError::Transport("fake adapter queue empty".to_string())),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
