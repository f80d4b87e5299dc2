//! Generation Request Types
//!
//! Provider-agnostic inputs for text-to-video, avatar narration and
//! compositing submissions.

use serde::{Deserialize, Serialize};

use super::providers::ProviderCapability;
use crate::core::timeline::CompositeSpec;

/// Maximum prompt length accepted by any provider
pub const MAX_PROMPT_CHARS: usize = 4096;

/// Vertical output used by every provider in the pipeline
pub const DEFAULT_ASPECT_RATIO: &str = "9:16";

// =============================================================================
// Video Generation Params
// =============================================================================

/// Parameters for one text-to-video submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoGenerationParams {
    /// Visual prompt sent verbatim to the provider
    pub prompt: String,
    /// Clip length override; `None` uses the provider's configured default
    #[serde(default)]
    pub duration_sec: Option<u32>,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
}

fn default_aspect_ratio() -> String {
    DEFAULT_ASPECT_RATIO.to_string()
}

impl VideoGenerationParams {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            duration_sec: None,
            aspect_ratio: default_aspect_ratio(),
        }
    }

    pub fn with_duration(mut self, duration_sec: u32) -> Self {
        self.duration_sec = Some(duration_sec);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        let trimmed = self.prompt.trim();
        if trimmed.is_empty() {
            return Err("Prompt cannot be empty".to_string());
        }
        if trimmed.chars().count() > MAX_PROMPT_CHARS {
            return Err(format!(
                "Prompt too long (max {} characters)",
                MAX_PROMPT_CHARS
            ));
        }
        Ok(())
    }

    /// Picks the requested duration, or the default, checked against `allowed`
    pub fn resolve_duration(&self, default: u32, allowed: &[u32]) -> Result<u32, String> {
        let duration = self.duration_sec.unwrap_or(default);
        if allowed.is_empty() || allowed.contains(&duration) {
            Ok(duration)
        } else {
            Err(format!(
                "Unsupported duration {}s (allowed: {})",
                duration,
                allowed
                    .iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        }
    }
}

// =============================================================================
// Avatar Params
// =============================================================================

/// Parameters for one avatar narration submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarParams {
    pub avatar_id: String,
    pub voice_id: String,
    /// Spoken text, already truncated to narration length
    pub script: String,
}

impl AvatarParams {
    pub fn new(
        avatar_id: impl Into<String>,
        voice_id: impl Into<String>,
        script: impl Into<String>,
    ) -> Self {
        Self {
            avatar_id: avatar_id.into(),
            voice_id: voice_id.into(),
            script: script.into(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.avatar_id.trim().is_empty() {
            return Err("Avatar id cannot be empty".to_string());
        }
        if self.voice_id.trim().is_empty() {
            return Err("Voice id cannot be empty".to_string());
        }
        if self.script.trim().is_empty() {
            return Err("Spoken script cannot be empty".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Generation Request
// =============================================================================

/// A submission routed to a [`super::providers::GenerativeProvider`]
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationRequest {
    Video(VideoGenerationParams),
    Avatar(AvatarParams),
    Composite(CompositeSpec),
}

impl GenerationRequest {
    /// Capability a provider needs to serve this request
    pub fn capability(&self) -> ProviderCapability {
        match self {
            GenerationRequest::Video(_) => ProviderCapability::VideoGeneration,
            GenerationRequest::Avatar(_) => ProviderCapability::AvatarNarration,
            GenerationRequest::Composite(_) => ProviderCapability::Compositing,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_defaults() {
        let params = VideoGenerationParams::new("Slow dolly over a desk");
        assert_eq!(params.aspect_ratio, "9:16");
        assert!(params.duration_sec.is_none());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_params_validation() {
        assert!(VideoGenerationParams::new("   ").validate().is_err());
        let long = "a".repeat(MAX_PROMPT_CHARS + 1);
        assert!(VideoGenerationParams::new(long).validate().is_err());
    }

    #[test]
    fn test_resolve_duration() {
        let params = VideoGenerationParams::new("p");
        assert_eq!(params.resolve_duration(8, &[4, 6, 8]), Ok(8));

        let params = params.with_duration(6);
        assert_eq!(params.resolve_duration(8, &[4, 6, 8]), Ok(6));

        let params = VideoGenerationParams::new("p").with_duration(7);
        let err = params.resolve_duration(8, &[4, 6, 8]).unwrap_err();
        assert!(err.contains("allowed: 4, 6, 8"));
        assert_eq!(params.resolve_duration(5, &[]), Ok(7));
    }

    #[test]
    fn test_avatar_validation() {
        assert!(AvatarParams::new("a1", "v1", "Hello").validate().is_ok());
        assert!(AvatarParams::new("", "v1", "Hello").validate().is_err());
        assert!(AvatarParams::new("a1", "v1", " ").validate().is_err());
    }

    #[test]
    fn test_request_capability() {
        let req = GenerationRequest::Video(VideoGenerationParams::new("p"));
        assert_eq!(req.capability(), ProviderCapability::VideoGeneration);
        let req = GenerationRequest::Avatar(AvatarParams::new("a", "v", "s"));
        assert_eq!(req.capability(), ProviderCapability::AvatarNarration);
    }
}
