//! HeyGen Avatar Narration Provider
//!
//! Submits a talking-avatar video over a solid green background (keyed out at
//! compositing time) and exposes the avatar/voice catalog used to pick one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::http::{build_client, error_or, send_json};
use crate::core::generative::providers::{unsupported_request, GenerativeProvider, ProviderCapability};
use crate::core::generative::task::{GenerationTask, TaskStatus};
use crate::core::generative::video::{AvatarParams, GenerationRequest};
use crate::core::{CoreError, CoreResult};

// =============================================================================
// Constants
// =============================================================================

const DEFAULT_BASE_URL: &str = "https://api.heygen.com";
const PLATFORM: &str = "HeyGen";
const MODEL: &str = "Avatar IV";

/// Chroma-key color removed by the compositing stage
pub const GREEN_SCREEN: &str = "#00FF00";

const OUTPUT_WIDTH: u32 = 720;
const OUTPUT_HEIGHT: u32 = 1280;

// =============================================================================
// API Request/Response Types
// =============================================================================

#[derive(Debug, Serialize)]
struct GenerateBody {
    video_inputs: Vec<VideoInput>,
    dimension: Dimension,
}

#[derive(Debug, Serialize)]
struct VideoInput {
    character: Character,
    voice: Voice,
    background: Background,
}

#[derive(Debug, Serialize)]
struct Character {
    #[serde(rename = "type")]
    kind: &'static str,
    avatar_id: String,
    avatar_style: &'static str,
}

#[derive(Debug, Serialize)]
struct Voice {
    #[serde(rename = "type")]
    kind: &'static str,
    input_text: String,
    voice_id: String,
}

#[derive(Debug, Serialize)]
struct Background {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'static str,
}

#[derive(Debug, Serialize)]
struct Dimension {
    width: u32,
    height: u32,
}

/// HeyGen wraps every payload in `{"data": ...}`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct GenerateData {
    #[serde(default)]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoStatusData {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct AvatarList {
    #[serde(default)]
    avatars: Vec<RawAvatar>,
}

#[derive(Debug, Deserialize)]
struct RawAvatar {
    #[serde(default)]
    avatar_id: Option<String>,
    #[serde(default)]
    avatar_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    preview_image_url: Option<String>,
    #[serde(default)]
    preview_url: Option<String>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    avatar_style: Option<String>,
    #[serde(default)]
    style: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VoiceList {
    #[serde(default)]
    voices: Vec<RawVoice>,
}

#[derive(Debug, Deserialize)]
struct RawVoice {
    #[serde(default)]
    voice_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    gender: Option<String>,
}

// =============================================================================
// Catalog Types
// =============================================================================

/// One selectable avatar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarInfo {
    pub avatar_id: Option<String>,
    pub name: String,
    pub thumbnail: Option<String>,
    pub gender: String,
    pub is_avatar_iv: bool,
}

/// One selectable English voice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceInfo {
    pub voice_id: Option<String>,
    pub name: String,
    pub language: String,
    pub gender: String,
}

/// Avatars and English voices available to the account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeyGenCatalog {
    pub avatars: Vec<AvatarInfo>,
    pub voices: Vec<VoiceInfo>,
}

impl From<RawAvatar> for AvatarInfo {
    fn from(raw: RawAvatar) -> Self {
        let style = raw
            .avatar_style
            .or(raw.style)
            .or(raw.kind)
            .unwrap_or_default();
        Self {
            avatar_id: raw.avatar_id,
            name: raw.avatar_name.or(raw.name).unwrap_or_default(),
            thumbnail: raw.preview_image_url.or(raw.preview_url),
            gender: raw.gender.unwrap_or_default(),
            is_avatar_iv: style.to_uppercase().contains("IV") || style.contains('4'),
        }
    }
}

fn english_voices(voices: Vec<RawVoice>) -> Vec<VoiceInfo> {
    voices
        .into_iter()
        .filter(|v| {
            v.language
                .as_deref()
                .unwrap_or_default()
                .to_lowercase()
                .starts_with("en")
        })
        .map(|v| VoiceInfo {
            voice_id: v.voice_id,
            name: v.name.unwrap_or_default(),
            language: v.language.unwrap_or_default(),
            gender: v.gender.unwrap_or_default(),
        })
        .collect()
}

fn map_video_status(data: &VideoStatusData) -> TaskStatus {
    match data.status.as_deref().unwrap_or("pending") {
        "pending" | "processing" | "waiting" => TaskStatus::Pending,
        "completed" => TaskStatus::succeeded_with(data.video_url.clone()),
        "failed" => TaskStatus::Failed {
            error: error_or(data.error.as_ref(), "Generation failed"),
        },
        other => {
            warn!("Unknown HeyGen video status: {}", other);
            TaskStatus::Pending
        }
    }
}

// =============================================================================
// HeyGenProvider
// =============================================================================

/// HeyGen avatar narration provider
pub struct HeyGenProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for HeyGenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeyGenProvider")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HeyGenProvider {
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

    fn require_key(&self) -> CoreResult<&str> {
        if self.api_key.is_empty() {
            return Err(CoreError::ConfigurationMissing("HEYGEN_API_KEY".to_string()));
        }
        Ok(&self.api_key)
    }

    fn build_body(params: &AvatarParams) -> GenerateBody {
        GenerateBody {
            video_inputs: vec![VideoInput {
                character: Character {
                    kind: "avatar",
                    avatar_id: params.avatar_id.clone(),
                    avatar_style: "normal",
                },
                voice: Voice {
                    kind: "text",
                    input_text: params.script.clone(),
                    voice_id: params.voice_id.clone(),
                },
                background: Background {
                    kind: "color",
                    value: GREEN_SCREEN,
                },
            }],
            dimension: Dimension {
                width: OUTPUT_WIDTH,
                height: OUTPUT_HEIGHT,
            },
        }
    }

    async fn get_data<T: serde::de::DeserializeOwned>(&self, url: String) -> CoreResult<T> {
        let key = self.require_key()?;
        let envelope: Envelope<T> = send_json(
            PLATFORM,
            self.client
                .get(url)
                .header("x-api-key", key)
                .header("accept", "application/json"),
        )
        .await?;
        envelope
            .data
            .ok_or_else(|| CoreError::UnexpectedResponse("HeyGen response missing data".to_string()))
    }

    /// Lists every avatar and the English voices. Errors propagate.
    pub async fn list_avatars_and_voices(&self) -> CoreResult<HeyGenCatalog> {
        let avatars: AvatarList = self.get_data(format!("{}/v2/avatars", self.base_url)).await?;
        let voices: VoiceList = self.get_data(format!("{}/v2/voices", self.base_url)).await?;

        let catalog = HeyGenCatalog {
            avatars: avatars.avatars.into_iter().map(AvatarInfo::from).collect(),
            voices: english_voices(voices.voices),
        };
        info!(
            "Fetched HeyGen catalog: {} avatars, {} English voices",
            catalog.avatars.len(),
            catalog.voices.len()
        );
        Ok(catalog)
    }

    async fn try_submit(&self, params: &AvatarParams) -> CoreResult<String> {
        let key = self.require_key()?;
        params.validate().map_err(CoreError::ValidationError)?;

        let envelope: Envelope<GenerateData> = send_json(
            PLATFORM,
            self.client
                .post(format!("{}/v2/video/generate", self.base_url))
                .header("x-api-key", key)
                .header("accept", "application/json")
                .json(&Self::build_body(params)),
        )
        .await?;

        let video_id = envelope
            .data
            .and_then(|d| d.video_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                CoreError::UnexpectedResponse("HeyGen response missing video_id".to_string())
            })?;

        info!("HeyGen avatar video submitted: video_id={}", video_id);
        Ok(video_id)
    }

    async fn try_poll(&self, video_id: &str) -> CoreResult<TaskStatus> {
        let key = self.require_key()?;
        let envelope: Envelope<VideoStatusData> = send_json(
            PLATFORM,
            self.client
                .get(format!("{}/v1/video_status.get", self.base_url))
                .query(&[("video_id", video_id)])
                .header("x-api-key", key)
                .header("accept", "application/json"),
        )
        .await?;

        let data = envelope.data.ok_or_else(|| {
            CoreError::UnexpectedResponse("HeyGen status response missing data".to_string())
        })?;
        debug!("HeyGen poll for video {}: status={:?}", video_id, data.status);
        Ok(map_video_status(&data))
    }
}

#[async_trait]
impl GenerativeProvider for HeyGenProvider {
    fn name(&self) -> &str {
        PLATFORM
    }

    fn model(&self) -> &str {
        MODEL
    }

    fn capabilities(&self) -> Vec<ProviderCapability> {
        vec![ProviderCapability::AvatarNarration]
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn submit(&self, request: &GenerationRequest) -> GenerationTask {
        let GenerationRequest::Avatar(params) = request else {
            return unsupported_request(self, request);
        };
        match self.try_submit(params).await {
            Ok(video_id) => {
                GenerationTask::pending(PLATFORM, MODEL, video_id).with_spoken_script(&params.script)
            }
            Err(e) => {
                warn!("HeyGen submission failed: {}", e);
                GenerationTask::error(PLATFORM, MODEL, e.to_string())
            }
        }
    }

    async fn poll(&self, video_id: &str) -> GenerationTask {
        let result = self.try_poll(video_id).await;
        GenerationTask::from_poll(PLATFORM, MODEL, video_id, result)
    }
}

// =============================================================================
// Tests
// =============================================================================
