//! Luma Dream Machine Provider

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::http::{build_client, send_json};
use crate::core::generative::providers::{unsupported_request, GenerativeProvider, ProviderCapability};
use crate::core::generative::task::{GenerationTask, TaskStatus};
use crate::core::generative::video::{GenerationRequest, VideoGenerationParams};
use crate::core::{CoreError, CoreResult};

const DEFAULT_BASE_URL: &str = "https://api.lumalabs.ai";
const PLATFORM: &str = "Luma";
const MODEL: &str = "ray-2";

/// Fixed clip length accepted by ray-2 in the pipeline
const DURATION: &str = "5s";

// =============================================================================
// API Request/Response Types
// =============================================================================

#[derive(Debug, Serialize)]
struct GenerationBody {
    prompt: String,
    aspect_ratio: String,
    duration: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct Generation {
    id: String,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    failure_reason: Option<String>,
    #[serde(default)]
    assets: Option<GenerationAssets>,
}

#[derive(Debug, Deserialize)]
struct GenerationAssets {
    #[serde(default)]
    video: Option<String>,
}

fn map_generation_state(generation: &Generation) -> TaskStatus {
    let state = generation.state.as_deref().unwrap_or("queued");
    match state {
        "queued" | "pending" | "dreaming" => TaskStatus::Pending,
        "completed" => TaskStatus::succeeded_with(
            generation.assets.as_ref().and_then(|a| a.video.clone()),
        ),
        "failed" => TaskStatus::Failed {
            error: generation
                .failure_reason
                .clone()
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| "Generation failed".to_string()),
        },
        other => {
            warn!("Unknown Luma generation state: {}", other);
            TaskStatus::Pending
        }
    }
}

// =============================================================================
// LumaProvider
// =============================================================================

/// Luma Dream Machine text-to-video provider
pub struct LumaProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for LumaProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LumaProvider")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl LumaProvider {
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

    fn generations_url(&self) -> String {
        format!("{}/dream-machine/v1/generations", self.base_url)
    }

    fn generation_url(&self, id: &str) -> String {
        format!("{}/dream-machine/v1/generations/{}", self.base_url, id)
    }

    fn require_key(&self) -> CoreResult<&str> {
        if self.api_key.is_empty() {
            return Err(CoreError::ConfigurationMissing("LUMAAI_API_KEY".to_string()));
        }
        Ok(&self.api_key)
    }

    async fn try_submit(&self, params: &VideoGenerationParams) -> CoreResult<String> {
        let key = self.require_key()?;
        params.validate().map_err(CoreError::ValidationError)?;

        let body = GenerationBody {
            prompt: params.prompt.clone(),
            aspect_ratio: params.aspect_ratio.clone(),
            duration: DURATION.to_string(),
            model: MODEL.to_string(),
        };

        let generation: Generation = send_json(
            PLATFORM,
            self.client
                .post(self.generations_url())
                .bearer_auth(key)
                .json(&body),
        )
        .await?;

        info!("Luma generation submitted: id={}", generation.id);
        Ok(generation.id)
    }

    async fn try_poll(&self, id: &str) -> CoreResult<TaskStatus> {
        let key = self.require_key()?;
        let generation: Generation = send_json(
            PLATFORM,
            self.client.get(self.generation_url(id)).bearer_auth(key),
        )
        .await?;

        debug!("Luma poll for generation {}: state={:?}", id, generation.state);
        Ok(map_generation_state(&generation))
    }
}

#[async_trait]
impl GenerativeProvider for LumaProvider {
    fn name(&self) -> &str {
        PLATFORM
    }

    fn model(&self) -> &str {
        MODEL
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
            warn!("Luma submission failed: {}", e);
        }
        GenerationTask::from_submit(PLATFORM, MODEL, result)
    }

    async fn poll(&self, id: &str) -> GenerationTask {
        let result = self.try_poll(id).await;
        GenerationTask::from_poll(PLATFORM, MODEL, id, result)
    }
}

// =============================================================================
// Tests
// =============================================================================
