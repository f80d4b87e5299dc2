//! fal.ai Queue Provider
//!
//! One adapter for the three models hosted on the fal.ai queue: Kling 2.6 Pro,
//! Pika 2.2 and Hailuo 02 Pro. Submission goes to `{queue}/{model_path}`;
//! status and result live under the model's app id (its first two path
//! segments), so a completed status needs a second call to fetch the video.

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

const DEFAULT_QUEUE_URL: &str = "https://queue.fal.run";

// =============================================================================
// Models
// =============================================================================

/// Models served through the fal.ai queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FalModel {
    Kling,
    Pika,
    Hailuo,
}

impl FalModel {
    /// Full model path used for submission
    pub fn path(&self) -> &'static str {
        match self {
            FalModel::Kling => "fal-ai/kling-video/v2.6/pro/text-to-video",
            FalModel::Pika => "fal-ai/pika/v2.2/text-to-video",
            FalModel::Hailuo => "fal-ai/minimax/hailuo-02/pro/text-to-video",
        }
    }

    /// App id (first two path segments) used for status and result calls
    pub fn app_id(&self) -> String {
        self.path().split('/').take(2).collect::<Vec<_>>().join("/")
    }

    pub fn platform(&self) -> &'static str {
        match self {
            FalModel::Kling => "fal.ai",
            FalModel::Pika => "Pika",
            FalModel::Hailuo => "Hailuo",
        }
    }

    pub fn model_tag(&self) -> &'static str {
        match self {
            FalModel::Kling => "kling-2.6-pro",
            FalModel::Pika => "pika-2.2",
            FalModel::Hailuo => "hailuo-02-pro",
        }
    }
}

// =============================================================================
// API Request/Response Types
// =============================================================================

#[derive(Debug, Serialize)]
struct FalArguments {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt_optimizer: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct QueueSubmitResponse {
    request_id: String,
}

#[derive(Debug, Deserialize)]
struct QueueStatus {
    status: String,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct QueueResult {
    #[serde(default)]
    video: Option<FalFile>,
    #[serde(default)]
    videos: Vec<FalFile>,
}

#[derive(Debug, Deserialize)]
struct FalFile {
    #[serde(default)]
    url: Option<String>,
}

/// Outcome of one queue status check
#[derive(Debug, PartialEq)]
enum QueuePhase {
    Pending,
    Completed,
    Failed(String),
}

fn map_queue_status(status: &QueueStatus) -> QueuePhase {
    match status.status.as_str() {
        "IN_QUEUE" | "IN_PROGRESS" => QueuePhase::Pending,
        "COMPLETED" => match &status.error {
            Some(error) if !error.is_null() => {
                QueuePhase::Failed(error_or(Some(error), "Generation failed"))
            }
            _ => QueuePhase::Completed,
        },
        "FAILED" | "ERROR" => QueuePhase::Failed(error_or(status.error.as_ref(), "Generation failed")),
        other => {
            warn!("Unknown fal.ai queue status: {}", other);
            QueuePhase::Pending
        }
    }
}

/// Video URL from a singular `video` object or the first `videos` entry
fn extract_result_url(result: &QueueResult) -> Option<String> {
    result
        .video
        .as_ref()
        .and_then(|v| v.url.clone())
        .or_else(|| result.videos.first().and_then(|v| v.url.clone()))
}

// =============================================================================
// FalProvider
// =============================================================================

/// fal.ai queue provider for one hosted model
pub struct FalProvider {
    client: reqwest::Client,
    api_key: String,
    queue_url: String,
    model: FalModel,
}

impl std::fmt::Debug for FalProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FalProvider")
            .field("queue_url", &self.queue_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl FalProvider {
    pub fn new(api_key: impl Into<String>, model: FalModel, timeout: Duration) -> CoreResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            api_key: api_key.into(),
            queue_url: DEFAULT_QUEUE_URL.to_string(),
            model,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.queue_url = url.into();
        self
    }

    fn submit_url(&self) -> String {
        format!("{}/{}", self.queue_url, self.model.path())
    }

    fn status_url(&self, request_id: &str) -> String {
        format!(
            "{}/{}/requests/{}/status",
            self.queue_url,
            self.model.app_id(),
            request_id
        )
    }

    fn result_url(&self, request_id: &str) -> String {
        format!("{}/{}/requests/{}", self.queue_url, self.model.app_id(), request_id)
    }

    fn auth_header(&self) -> CoreResult<String> {
        if self.api_key.is_empty() {
            return Err(CoreError::ConfigurationMissing("FAL_KEY".to_string()));
        }
        Ok(format!("Key {}", self.api_key))
    }

    fn build_arguments(&self, params: &VideoGenerationParams) -> CoreResult<FalArguments> {
        params.validate().map_err(CoreError::ValidationError)?;
        let prompt = params.prompt.clone();

        let args = match self.model {
            FalModel::Kling => {
                let duration = params
                    .resolve_duration(10, &[5, 10])
                    .map_err(CoreError::ValidationError)?;
                FalArguments {
                    prompt,
                    aspect_ratio: Some(params.aspect_ratio.clone()),
                    duration: Some(duration.to_string()),
                    prompt_optimizer: None,
                }
            }
            FalModel::Pika => FalArguments {
                prompt,
                aspect_ratio: Some(params.aspect_ratio.clone()),
                duration: None,
                prompt_optimizer: None,
            },
            FalModel::Hailuo => FalArguments {
                prompt,
                aspect_ratio: None,
                duration: None,
                prompt_optimizer: Some(true),
            },
        };
        Ok(args)
    }

    async fn try_submit(&self, params: &VideoGenerationParams) -> CoreResult<String> {
        let auth = self.auth_header()?;
        let args = self.build_arguments(params)?;

        let response: QueueSubmitResponse = send_json(
            self.model.platform(),
            self.client
                .post(self.submit_url())
                .header("Authorization", auth)
                .json(&args),
        )
        .await?;

        info!(
            "fal.ai {} generation submitted: request_id={}",
            self.model.model_tag(),
            response.request_id
        );
        Ok(response.request_id)
    }

    async fn try_poll(&self, request_id: &str) -> CoreResult<TaskStatus> {
        let auth = self.auth_header()?;
        let status: QueueStatus = send_json(
            self.model.platform(),
            self.client
                .get(self.status_url(request_id))
                .header("Authorization", auth.as_str()),
        )
        .await?;

        debug!(
            "fal.ai poll for {} request {}: status={}",
            self.model.model_tag(),
            request_id,
            status.status
        );

        match map_queue_status(&status) {
            QueuePhase::Pending => Ok(TaskStatus::Pending),
            QueuePhase::Failed(error) => Ok(TaskStatus::Failed { error }),
            QueuePhase::Completed => {
                let result: QueueResult = send_json(
                    self.model.platform(),
                    self.client
                        .get(self.result_url(request_id))
                        .header("Authorization", auth.as_str()),
                )
                .await?;
                Ok(TaskStatus::succeeded_with(extract_result_url(&result)))
            }
        }
    }
}

#[async_trait]
impl GenerativeProvider for FalProvider {
    fn name(&self) -> &str {
        self.model.platform()
    }

    fn model(&self) -> &str {
        self.model.model_tag()
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
            warn!("fal.ai {} submission failed: {}", self.model.model_tag(), e);
        }
        GenerationTask::from_submit(self.model.platform(), self.model.model_tag(), result)
    }

    async fn poll(&self, request_id: &str) -> GenerationTask {
        let result = self.try_poll(request_id).await;
        GenerationTask::from_poll(
            self.model.platform(),
            self.model.model_tag(),
            request_id,
            result,
        )
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(model: FalModel) -> FalProvider {
        FalProvider::new("fal-key", model, Duration::from_secs(30)).unwrap()
    }

    #[test]
    fn test_app_id_and_urls() {
        assert_eq!(FalModel::Kling.app_id(), "fal-ai/kling-video");
        assert_eq!(FalModel::Hailuo.app_id(), "fal-ai/minimax");

        let kling = provider(FalModel::Kling);
        assert_eq!(
            kling.submit_url(),
            "https://queue.fal.run/fal-ai/kling-video/v2.6/pro/text-to-video"
        );
        assert_eq!(
            kling.status_url("req-1"),
            "https://queue.fal.run/fal-ai/kling-video/requests/req-1/status"
        );
        assert_eq!(
            kling.result_url("req-1"),
            "https://queue.fal.run/fal-ai/kling-video/requests/req-1"
        );
    }

    #[test]
    fn test_platform_tags() {
        assert_eq!(provider(FalModel::Kling).name(), "fal.ai");
        assert_eq!(provider(FalModel::Kling).model(), "kling-2.6-pro");
        assert_eq!(provider(FalModel::Pika).name(), "Pika");
        assert_eq!(provider(FalModel::Hailuo).model(), "hailuo-02-pro");
    }

    #[test]
    fn test_arguments_per_model() {
        let params = VideoGenerationParams::new("Macro shot of coffee crema");

        let kling = serde_json::to_value(provider(FalModel::Kling).build_arguments(&params).unwrap()).unwrap();
        assert_eq!(kling["aspect_ratio"], "9:16");
        assert_eq!(kling["duration"], "10");
        assert!(kling.get("prompt_optimizer").is_none());

        let pika = serde_json::to_value(provider(FalModel::Pika).build_arguments(&params).unwrap()).unwrap();
        assert_eq!(pika["aspect_ratio"], "9:16");
        assert!(pika.get("duration").is_none());

        let hailuo = serde_json::to_value(provider(FalModel::Hailuo).build_arguments(&params).unwrap()).unwrap();
        assert_eq!(hailuo["prompt_optimizer"], true);
        assert!(hailuo.get("aspect_ratio").is_none());
    }

    #[test]
    fn test_kling_duration_override() {
        let params = VideoGenerationParams::new("p").with_duration(5);
        let args = provider(FalModel::Kling).build_arguments(&params).unwrap();
        assert_eq!(args.duration.as_deref(), Some("5"));

        let params = VideoGenerationParams::new("p").with_duration(8);
        assert!(provider(FalModel::Kling).build_arguments(&params).is_err());
    }

    #[test]
    fn test_status_vocabulary() {
        let parse = |json: &str| map_queue_status(&serde_json::from_str::<QueueStatus>(json).unwrap());

        assert_eq!(parse(r#"{"status":"IN_QUEUE","queue_position":3}"#), QueuePhase::Pending);
        assert_eq!(parse(r#"{"status":"IN_PROGRESS"}"#), QueuePhase::Pending);
        assert_eq!(parse(r#"{"status":"COMPLETED"}"#), QueuePhase::Completed);
        assert_eq!(
            parse(r#"{"status":"COMPLETED","error":{"msg":"prompt rejected"}}"#),
            QueuePhase::Failed("prompt rejected".to_string())
        );
        assert_eq!(
            parse(r#"{"status":"FAILED"}"#),
            QueuePhase::Failed("Generation failed".to_string())
        );
    }

    #[test]
    fn test_result_url_shapes() {
        let single: QueueResult =
            serde_json::from_str(r#"{"video":{"url":"https://fal.media/a.mp4"}}"#).unwrap();
        assert_eq!(extract_result_url(&single).as_deref(), Some("https://fal.media/a.mp4"));

        let list: QueueResult =
            serde_json::from_str(r#"{"videos":[{"url":"https://fal.media/b.mp4"}]}"#).unwrap();
        assert_eq!(extract_result_url(&list).as_deref(), Some("https://fal.media/b.mp4"));

        let empty: QueueResult = serde_json::from_str(r#"{"seed":42}"#).unwrap();
        assert!(extract_result_url(&empty).is_none());
        assert_eq!(TaskStatus::succeeded_with(extract_result_url(&empty)).as_str(), "error");
    }

    #[tokio::test]
    async fn test_missing_key_fails_soft() {
        let provider = FalProvider::new("", FalModel::Pika, Duration::from_secs(5)).unwrap();
        let task = provider
            .submit(&GenerationRequest::Video(VideoGenerationParams::new("p")))
            .await;
        assert_eq!(task.platform, "Pika");
        assert_eq!(task.error_message(), Some("FAL_KEY not configured"));
        assert!(task.task_id.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_queue_fails_soft() {
        let provider = provider(FalModel::Hailuo).with_base_url("http://127.0.0.1:1");
        let task = provider
            .submit(&GenerationRequest::Video(VideoGenerationParams::new("p")))
            .await;
        assert_eq!(task.status.as_str(), "error");
        assert!(task.task_id.is_none());
    }
}
