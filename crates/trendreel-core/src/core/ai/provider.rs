//! Oracle Provider
//!
//! The language model behind every analysis and concept stage. Stages build a
//! [`CompletionRequest`], hand it to an [`AIProvider`] and parse the text back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::core::{CoreError, CoreResult};

// =============================================================================
// AI Provider Trait
// =============================================================================

/// A backend that turns one prompt into one block of text
#[async_trait]
pub trait AIProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Sends a single-turn completion. Transport and API faults propagate.
    async fn complete(&self, request: CompletionRequest) -> CoreResult<CompletionResponse>;

    /// Whether a credential is configured
    fn is_available(&self) -> bool;
}

// =============================================================================
// Completion Request
// =============================================================================

/// One single-turn completion
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    /// Role the oracle plays for the stage
    pub system: Option<String>,
    pub prompt: String,
    /// Falls back to the provider default when unset
    pub max_tokens: Option<u32>,
    /// Falls back to the provider default when unset
    pub model: Option<String>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_tokens: None,
            model: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

// =============================================================================
// Completion Response
// =============================================================================

/// Text returned by the oracle, before any JSON parsing
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    pub text: String,
    /// Model that actually answered
    pub model: String,
    pub usage: TokenUsage,
    pub finish_reason: FinishReason,
}

/// Token usage statistics
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt: u32, completion: u32) -> Self {
        Self {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        }
    }
}

/// Reason for completion finish
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Normal stop
    #[default]
    Stop,
    /// Reached max tokens; JSON output is likely cut short
    Length,
}

// =============================================================================
// Mock Provider (for testing)
// =============================================================================

/// Mock AI provider for testing.
///
/// Replays queued responses in order, then falls back to the default
/// response. Every request is recorded for inspection.
pub struct MockAIProvider {
    name: String,
    response: String,
    queued: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
    available: bool,
}

impl MockAIProvider {
    /// Creates a new mock provider
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            response: "Mock response".to_string(),
            queued: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            available: true,
        }
    }

    /// Sets the mock response
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Queues a one-shot response, served before the default one
    pub fn with_queued_response(self, response: &str) -> Self {
        if let Ok(mut queued) = self.queued.lock() {
            queued.push_back(response.to_string());
        }
        self
    }

    /// Sets availability
    pub fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AIProvider for MockAIProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> CoreResult<CompletionResponse> {
        if !self.available {
            return Err(CoreError::Internal("Provider not available".to_string()));
        }

        let model = request
            .model
            .clone()
            .unwrap_or_else(|| "mock-model".to_string());
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let text = self
            .queued
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| self.response.clone());

        Ok(CompletionResponse {
            text,
            model,
            usage: TokenUsage::new(10, 20),
            finish_reason: FinishReason::Stop,
        })
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

// =============================================================================
// Tests
// =============================================================================
