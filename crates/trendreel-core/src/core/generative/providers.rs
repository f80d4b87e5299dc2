//! Generative Providers
//!
//! Provider abstraction over the third-party video, avatar and compositing
//! services. Adapters are fail-soft: `submit` and `poll` always return a
//! [`GenerationTask`], folding transport and provider faults into its status.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::task::{GenerationTask, TaskStatus};
use super::video::GenerationRequest;

/// Capabilities supported by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderCapability {
    /// Text-to-video clip generation
    VideoGeneration,
    /// Talking-avatar narration over a chroma-key background
    AvatarNarration,
    /// Timeline rendering of already generated media
    Compositing,
}

impl std::fmt::Display for ProviderCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderCapability::VideoGeneration => write!(f, "Video Generation"),
            ProviderCapability::AvatarNarration => write!(f, "Avatar Narration"),
            ProviderCapability::Compositing => write!(f, "Compositing"),
        }
    }
}

/// Trait for asynchronous generation backends
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Platform tag reported on every task (e.g. `RunwayML`)
    fn name(&self) -> &str;

    /// Model tag reported on every task (e.g. `veo3.1`)
    fn model(&self) -> &str;

    /// Returns supported capabilities
    fn capabilities(&self) -> Vec<ProviderCapability>;

    /// Checks if provider supports a capability
    fn supports(&self, capability: ProviderCapability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Checks if the provider has the credential it needs
    fn is_available(&self) -> bool;

    /// Submits one request. Never fails: faults come back as an `error` task.
    async fn submit(&self, request: &GenerationRequest) -> GenerationTask;

    /// Checks a previously submitted task once, without retrying
    async fn poll(&self, task_id: &str) -> GenerationTask;
}

/// Error task for a request kind the provider cannot serve
pub fn unsupported_request(
    provider: &dyn GenerativeProvider,
    request: &GenerationRequest,
) -> GenerationTask {
    GenerationTask::error(
        provider.name(),
        provider.model(),
        format!(
            "{} does not support {}",
            provider.name(),
            request.capability()
        ),
    )
}

// ============================================================================
// Mock Provider for Testing
// ============================================================================

/// Terminal outcome a [`MockGenerativeProvider`] reports on poll
#[derive(Debug, Clone, PartialEq)]
pub enum MockOutcome {
    Pending,
    Succeed,
    Fail(String),
}

/// Mock provider for testing
#[derive(Debug)]
pub struct MockGenerativeProvider {
    name: String,
    model: String,
    capabilities: Vec<ProviderCapability>,
    available: bool,
    outcome: MockOutcome,
    submit_delay: Duration,
    panic_on_submit: bool,
}

impl MockGenerativeProvider {
    /// Creates a new mock provider
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: "mock-model".to_string(),
            capabilities: vec![
                ProviderCapability::VideoGeneration,
                ProviderCapability::AvatarNarration,
                ProviderCapability::Compositing,
            ],
            available: true,
            outcome: MockOutcome::Succeed,
            submit_delay: Duration::ZERO,
            panic_on_submit: false,
        }
    }

    /// Sets availability
    pub fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    /// Sets capabilities
    pub fn with_capabilities(mut self, caps: Vec<ProviderCapability>) -> Self {
        self.capabilities = caps;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_outcome(mut self, outcome: MockOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Delays submission, for ordering tests
    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    /// Panics inside `submit`, for join-failure tests
    pub fn with_panic_on_submit(mut self) -> Self {
        self.panic_on_submit = true;
        self
    }
}

#[async_trait]
impl GenerativeProvider for MockGenerativeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn capabilities(&self) -> Vec<ProviderCapability> {
        self.capabilities.clone()
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn submit(&self, request: &GenerationRequest) -> GenerationTask {
        if !self.available {
            return GenerationTask::error(
                &self.name,
                &self.model,
                format!("{} not configured", self.name),
            );
        }
        if !self.supports(request.capability()) {
            return unsupported_request(self, request);
        }
        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }
        if self.panic_on_submit {
            panic!("mock provider {} panicked during submit", self.name);
        }

        GenerationTask::pending(&self.name, &self.model, ulid::Ulid::new().to_string())
    }

    async fn poll(&self, task_id: &str) -> GenerationTask {
        let status = match &self.outcome {
            MockOutcome::Pending => TaskStatus::Pending,
            MockOutcome::Succeed => TaskStatus::Succeeded {
                video_url: format!("https://mock.example/{}.mp4", task_id),
            },
            MockOutcome::Fail(error) => TaskStatus::Failed {
                error: error.clone(),
            },
        };
        GenerationTask::with_status(&self.name, &self.model, Some(task_id.to_string()), status)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::generative::video::{AvatarParams, VideoGenerationParams};

    // ========================================================================
    // ProviderCapability Tests
    // ========================================================================

    #[test]
    fn test_capability_display() {
        assert_eq!(
            ProviderCapability::VideoGeneration.to_string(),
            "Video Generation"
        );
        assert_eq!(ProviderCapability::Compositing.to_string(), "Compositing");
    }

    #[test]
    fn test_capability_serialization() {
        let json = serde_json::to_string(&ProviderCapability::AvatarNarration).unwrap();
        assert_eq!(json, "\"avatar_narration\"");
    }

    // ========================================================================
    // Mock Provider Tests
    // ========================================================================

    #[tokio::test]
    async fn test_mock_provider_submit_returns_pending() {
        let provider = MockGenerativeProvider::new("Mock");
        let request = GenerationRequest::Video(VideoGenerationParams::new("A sunset"));

        let task = provider.submit(&request).await;

        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.task_id.is_some());
        assert_eq!(task.platform, "Mock");
    }

    #[tokio::test]
    async fn test_mock_provider_unavailable() {
        let provider = MockGenerativeProvider::new("Mock").with_available(false);
        let request = GenerationRequest::Video(VideoGenerationParams::new("A sunset"));

        let task = provider.submit(&request).await;

        assert_eq!(task.status.as_str(), "error");
        assert!(task.task_id.is_none());
    }

    #[tokio::test]
    async fn test_mock_provider_unsupported_capability() {
        let provider = MockGenerativeProvider::new("Mock")
            .with_capabilities(vec![ProviderCapability::VideoGeneration]);
        let request = GenerationRequest::Avatar(AvatarParams::new("a", "v", "Hello"));

        let task = provider.submit(&request).await;

        assert!(task
            .error_message()
            .unwrap()
            .contains("does not support Avatar Narration"));
    }

    #[tokio::test]
    async fn test_mock_provider_poll_is_idempotent() {
        let provider = MockGenerativeProvider::new("Mock");
        let first = provider.poll("task-1").await;
        let second = provider.poll("task-1").await;

        assert_eq!(first, second);
        assert_eq!(first.video_url(), Some("https://mock.example/task-1.mp4"));
    }
}
