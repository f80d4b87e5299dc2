//! Shotstack Compositing Provider
//!
//! Renders a [`TimelineDoc`] and reports the render through the same task
//! contract as the generation providers.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::http::{build_client, error_or, send_json};
use crate::core::generative::providers::{unsupported_request, GenerativeProvider, ProviderCapability};
use crate::core::generative::task::{GenerationTask, TaskStatus};
use crate::core::generative::video::GenerationRequest;
use crate::core::timeline::{build_timeline, CompositeSpec};
use crate::core::{CoreError, CoreResult};

/// Sandbox ("stage") environment
const DEFAULT_BASE_URL: &str = "https://api.shotstack.io/edit/stage";
const PLATFORM: &str = "Shotstack";
const MODEL: &str = "render";

// =============================================================================
// API Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: Option<T>,
}

#[derive(Debug, Deserialize)]
struct QueuedRender {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RenderStatus {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

fn map_render_status(render: &RenderStatus) -> TaskStatus {
    match render.status.as_deref().unwrap_or("queued") {
        "queued" | "fetching" | "rendering" | "saving" => TaskStatus::Pending,
        "done" => TaskStatus::succeeded_with(render.url.clone()),
        "failed" | "cancelled" => TaskStatus::Failed {
            error: error_or(render.error.as_ref(), "Render failed"),
        },
        other => {
            warn!("Unknown Shotstack render status: {}", other);
            TaskStatus::Pending
        }
    }
}

// =============================================================================
// ShotstackProvider
// =============================================================================

/// Shotstack render provider
pub struct ShotstackProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for ShotstackProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShotstackProvider")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ShotstackProvider {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> CoreResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn render_url(&self) -> String {
        format!("{}/render", self.base_url)
    }

    fn status_url(&self, render_id: &str) -> String {
        format!("{}/render/{}", self.base_url, render_id)
    }

    fn require_key(&self) -> CoreResult<&str> {
        if self.api_key.is_empty() {
            return Err(CoreError::ConfigurationMissing("SHOTSTACK_API_KEY".to_string()));
        }
        Ok(&self.api_key)
    }

    async fn try_submit(&self, spec: &CompositeSpec) -> CoreResult<String> {
        let key = self.require_key()?;
        spec.validate().map_err(CoreError::ValidationError)?;
        let doc = build_timeline(spec);

        let envelope: Envelope<QueuedRender> = send_json(
            PLATFORM,
            self.client
                .post(self.render_url())
                .header("x-api-key", key)
                .header("Accept", "application/json")
                .json(&doc),
        )
        .await?;

        let render_id = envelope
            .response
            .and_then(|r| r.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                CoreError::UnexpectedResponse("Shotstack response missing render id".to_string())
            })?;

        info!(
            "Shotstack render submitted: render_id={} duration={}s",
            render_id, spec.duration_secs
        );
        Ok(render_id)
    }

    async fn try_poll(&self, render_id: &str) -> CoreResult<TaskStatus> {
        let key = self.require_key()?;
        let envelope: Envelope<RenderStatus> = send_json(
            PLATFORM,
            self.client
                .get(self.status_url(render_id))
                .header("x-api-key", key)
                .header("Accept", "application/json"),
        )
        .await?;

        let render = envelope.response.ok_or_else(|| {
            CoreError::UnexpectedResponse("Shotstack status missing response".to_string())
        })?;
        debug!("Shotstack poll for render {}: status={:?}", render_id, render.status);
        Ok(map_render_status(&render))
    }
}

#[async_trait]
impl GenerativeProvider for ShotstackProvider {
    fn name(&self) -> &str {
        PLATFORM
    }

    fn model(&self) -> &str {
        MODEL
    }

    fn capabilities(&self) -> Vec<ProviderCapability> {
        vec![ProviderCapability::Compositing]
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn submit(&self, request: &GenerationRequest) -> GenerationTask {
        let GenerationRequest::Composite(spec) = request else {
            return unsupported_request(self, request);
        };
        let result = self.try_submit(spec).await;
        if let Err(e) = &result {
            warn!("Shotstack render submission failed: {}", e);
        }
        GenerationTask::from_submit(PLATFORM, MODEL, result)
    }

    async fn poll(&self, render_id: &str) -> GenerationTask {
        let result = self.try_poll(render_id).await;
        GenerationTask::from_poll(PLATFORM, MODEL, render_id, result)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn status(json: &str) -> TaskStatus {
        let envelope: Envelope<RenderStatus> = serde_json::from_str(json).unwrap();
        map_render_status(&envelope.response.unwrap())
    }

    fn spec() -> CompositeSpec {
        CompositeSpec {
            avatar_video_url: "https://heygen.cdn/a.mp4".to_string(),
            background_video_url: "https://fal.media/bg.mp4".to_string(),
            caption: "Hook".to_string(),
            music_track_id: "hype".to_string(),
            duration_secs: 30.0,
        }
    }

    #[test]
    fn test_url_building() {
        let provider = ShotstackProvider::new("key", Duration::from_secs(30)).unwrap();
        assert_eq!(provider.render_url(), "https://api.shotstack.io/edit/stage/render");
        assert_eq!(
            provider.status_url("r-1"),
            "https://api.shotstack.io/edit/stage/render/r-1"
        );
    }

    #[test]
    fn test_status_vocabulary() {
        for pending in ["queued", "fetching", "rendering", "saving"] {
            let json = format!(r#"{{"success":true,"response":{{"status":"{}"}}}}"#, pending);
            assert_eq!(status(&json), TaskStatus::Pending);
        }

        assert_eq!(
            status(r#"{"response":{"status":"done","url":"https://cdn.shotstack.io/r.mp4"}}"#)
                .video_url(),
            Some("https://cdn.shotstack.io/r.mp4")
        );
        assert_eq!(
            status(r#"{"response":{"status":"failed","error":"Asset 404"}}"#),
            TaskStatus::Failed {
                error: "Asset 404".to_string()
            }
        );
        assert_eq!(
            status(r#"{"response":{"status":"cancelled"}}"#).error(),
            Some("Render failed")
        );
        assert_eq!(status(r#"{"response":{"status":"done"}}"#).as_str(), "error");
    }

    #[tokio::test]
    async fn test_missing_key_fails_soft() {
        let provider = ShotstackProvider::new("", Duration::from_secs(5)).unwrap();
        let task = provider.submit(&GenerationRequest::Composite(spec())).await;
        assert_eq!(task.platform, "Shotstack");
        assert_eq!(task.error_message(), Some("SHOTSTACK_API_KEY not configured"));
    }

    #[tokio::test]
    async fn test_invalid_spec_fails_soft() {
        let provider = ShotstackProvider::new("key", Duration::from_secs(5)).unwrap();
        let mut bad = spec();
        bad.duration_secs = 0.0;
        let task = provider.submit(&GenerationRequest::Composite(bad)).await;
        assert_eq!(task.status.as_str(), "error");
        assert!(task.error_message().unwrap().contains("duration"));
    }
}
