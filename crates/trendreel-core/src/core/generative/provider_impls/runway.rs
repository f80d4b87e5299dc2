//! RunwayML Text-to-Video Provider
//!
//! Covers the two Runway models used by the pipeline (veo3.1 and gen4.5).
//! Both share the `/v1/text_to_video` submit endpoint and the `/v1/tasks`
//! status endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::http::{build_client, error_or, send_json};
use crate::core::generative::providers::{unsupported_request, GenerativeProvider, ProviderCapability};
use crate::core::generative::task::{GenerationTask, TaskStatus};
use crate::core::generative::video::{GenerationRequest, VideoGenerationParams};
use crate::core::{CoreError, CoreResult};

// =============================================================================
// Constants
// =============================================================================

const DEFAULT_BASE_URL: &str = "https://api.dev.runwayml.com";

/// API version pinned in the `X-Runway-Version` header
const API_VERSION: &str = "2024-11-06";

const PLATFORM: &str = "RunwayML";

/// Portrait ratio in Runway's pixel notation
const RATIO: &str = "720:1280";

// =============================================================================
// Models
// =============================================================================

/// Runway model variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunwayModel {
    Veo31,
    Gen45,
}

impl RunwayModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunwayModel::Veo31 => "veo3.1",
            RunwayModel::Gen45 => "gen4.5",
        }
    }

    pub fn default_duration(&self) -> u32 {
        match self {
            RunwayModel::Veo31 => 8,
            RunwayModel::Gen45 => 10,
        }
    }

    pub fn allowed_durations(&self) -> &'static [u32] {
        match self {
            RunwayModel::Veo31 => &[4, 6, 8],
            RunwayModel::Gen45 => &[5, 10],
        }
    }
}

// =============================================================================
// API Request/Response Types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextToVideoRequest {
    model: String,
    prompt_text: String,
    ratio: String,
    duration: u32,
}

#[derive(Debug, Deserialize)]
struct TextToVideoResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunwayTask {
    status: String,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    failure: Option<Value>,
}

/// Maps a Runway task payload to the uniform status
fn map_task_status(task: &RunwayTask) -> TaskStatus {
    match task.status.as_str() {
        "PENDING" | "RUNNING" | "THROTTLED" => TaskStatus::Pending,
        "SUCCEEDED" => {
            let url = match &task.output {
                Some(Value::Array(items)) => items.first().and_then(Value::as_str),
                Some(Value::String(url)) => Some(url.as_str()),
                _ => None,
            };
            TaskStatus::succeeded_with(url.map(str::to_string))
        }
        "FAILED" | "CANCELLED" => TaskStatus::Failed {
            error: error_or(task.failure.as_ref(), "Generation failed"),
        },
        other => {
            warn!("Unknown Runway task status: {}", other);
            TaskStatus::Pending
        }
    }
}

// =============================================================================
// RunwayProvider
// =============================================================================

/// RunwayML text-to-video provider
pub struct RunwayProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: RunwayModel,
}

impl std::fmt::Debug for RunwayProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunwayProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl RunwayProvider {
    /// Creates a provider; an empty key leaves it unavailable
    pub fn new(api_key: impl Into<String>, model: RunwayModel, timeout: Duration) -> CoreResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
        })
    }

    /// Set custom base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn submit_url(&self) -> String {
        format!("{}/v1/text_to_video", self.base_url)
    }

    fn poll_url(&self, task_id: &str) -> String {
        format!("{}/v1/tasks/{}", self.base_url, task_id)
    }

    fn require_key(&self) -> CoreResult<&str> {
        if self.api_key.is_empty() {
            return Err(CoreError::ConfigurationMissing("RUNWAYML_API_KEY".to_string()));
        }
        Ok(&self.api_key)
    }

    fn build_request(&self, params: &VideoGenerationParams) -> CoreResult<TextToVideoRequest> {
        params.validate().map_err(CoreError::ValidationError)?;
        let duration = params
            .resolve_duration(self.model.default_duration(), self.model.allowed_durations())
            .map_err(CoreError::ValidationError)?;

        Ok(TextToVideoRequest {
            model: self.model.as_str().to_string(),
            prompt_text: params.prompt.clone(),
            ratio: RATIO.to_string(),
            duration,
        })
    }

    async fn try_submit(&self, params: &VideoGenerationParams) -> CoreResult<String> {
        let key = self.require_key()?;
        let body = self.build_request(params)?;

        let response: TextToVideoResponse = send_json(
            PLATFORM,
            self.client
                .post(self.submit_url())
                .bearer_auth(key)
                .header("X-Runway-Version", API_VERSION)
                .json(&body),
        )
        .await?;

        info!(
            "Runway {} generation submitted: task_id={}",
            self.model.as_str(),
            response.id
        );
        Ok(response.id)
    }

    async fn try_poll(&self, task_id: &str) -> CoreResult<TaskStatus> {
        let key = self.require_key()?;
        let task: RunwayTask = send_json(
            PLATFORM,
            self.client
                .get(self.poll_url(task_id))
                .bearer_auth(key)
                .header("X-Runway-Version", API_VERSION),
        )
        .await?;

        debug!("Runway poll for task {}: status={}", task_id, task.status);
        Ok(map_task_status(&task))
    }
}

#[async_trait]
impl GenerativeProvider for RunwayProvider {
    fn name(&self) -> &str {
        PLATFORM
    }

    fn model(&self) -> &str {
        self.model.as_str()
    }

    fn capabilities(&self) -> Vec<ProviderCapability> {
        vec![ProviderCapability::VideoGeneration]
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn submit(&self, request: &GenerationRequest) -> GenerationTask {
        let GenerationRequest::Video(params) = request else {
            return unsupported_request(self, request);
        };
        let result = self.try_submit(params).await;
        if let Err(e) = &result {
            warn!("Runway {} submission failed: {}", self.model.as_str(), e);
        }
        GenerationTask::from_submit(PLATFORM, self.model.as_str(), result)
    }

    async fn poll(&self, task_id: &str) -> GenerationTask {
        let result = self.try_poll(task_id).await;
        GenerationTask::from_poll(PLATFORM, self.model.as_str(), task_id, result)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn task(json: &str) -> RunwayTask {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_models() {
        assert_eq!(RunwayModel::Veo31.as_str(), "veo3.1");
        assert_eq!(RunwayModel::Veo31.default_duration(), 8);
        assert_eq!(RunwayModel::Gen45.as_str(), "gen4.5");
        assert_eq!(RunwayModel::Gen45.allowed_durations(), &[5, 10]);
    }

    #[test]
    fn test_url_building() {
        let provider = RunwayProvider::new("key", RunwayModel::Veo31, Duration::from_secs(30)).unwrap();
        assert_eq!(provider.submit_url(), "https://api.dev.runwayml.com/v1/text_to_video");
        assert_eq!(provider.poll_url("t-1"), "https://api.dev.runwayml.com/v1/tasks/t-1");
    }

    #[test]
    fn test_request_serialization() {
        let provider = RunwayProvider::new("key", RunwayModel::Gen45, Duration::from_secs(30)).unwrap();
        let body = provider
            .build_request(&VideoGenerationParams::new("Slow push-in on a desk"))
            .unwrap();
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], "gen4.5");
        assert_eq!(json["promptText"], "Slow push-in on a desk");
        assert_eq!(json["ratio"], "720:1280");
        assert_eq!(json["duration"], 10);
    }

    #[test]
    fn test_request_rejects_unsupported_duration() {
        let provider = RunwayProvider::new("key", RunwayModel::Veo31, Duration::from_secs(30)).unwrap();
        let params = VideoGenerationParams::new("p").with_duration(10);
        assert!(matches!(
            provider.build_request(&params),
            Err(CoreError::ValidationError(_))
        ));
    }

    #[test]
    fn test_status_vocabulary() {
        for pending in ["PENDING", "RUNNING", "THROTTLED"] {
            let json = format!(r#"{{"status":"{}"}}"#, pending);
            assert_eq!(map_task_status(&task(&json)), TaskStatus::Pending);
        }

        let done = task(r#"{"status":"SUCCEEDED","output":["https://cdn.runway/v.mp4"]}"#);
        assert_eq!(
            map_task_status(&done).video_url(),
            Some("https://cdn.runway/v.mp4")
        );

        let failed = task(r#"{"status":"FAILED","failure":"Content moderation"}"#);
        assert_eq!(
            map_task_status(&failed),
            TaskStatus::Failed {
                error: "Content moderation".to_string()
            }
        );

        let cancelled = task(r#"{"status":"CANCELLED"}"#);
        assert_eq!(map_task_status(&cancelled).as_str(), "failed");
    }

    #[test]
    fn test_success_without_output_is_error() {
        let done = task(r#"{"status":"SUCCEEDED","output":[]}"#);
        assert_eq!(map_task_status(&done).as_str(), "error");
    }

    #[tokio::test]
    async fn test_missing_key_fails_soft() {
        let provider = RunwayProvider::new("", RunwayModel::Veo31, Duration::from_secs(5)).unwrap();
        assert!(!provider.is_available());

        let task = provider
            .submit(&GenerationRequest::Video(VideoGenerationParams::new("p")))
            .await;
        assert_eq!(task.status.as_str(), "error");
        assert!(task.task_id.is_none());
        assert_eq!(task.error_message(), Some("RUNWAYML_API_KEY not configured"));
        assert_eq!(task.model, "veo3.1");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_soft() {
        let provider = RunwayProvider::new("key", RunwayModel::Gen45, Duration::from_secs(5))
            .unwrap()
            .with_base_url("http://127.0.0.1:1");

        let task = provider
            .submit(&GenerationRequest::Video(VideoGenerationParams::new("p")))
            .await;
        assert_eq!(task.status.as_str(), "error");
        assert!(task.task_id.is_none());
        assert!(task.error_message().unwrap().starts_with("Transport error"));

        let polled = provider.poll("t-1").await;
        assert_eq!(polled.status.as_str(), "error");
        assert_eq!(polled.task_id.as_deref(), Some("t-1"));
    }
}
