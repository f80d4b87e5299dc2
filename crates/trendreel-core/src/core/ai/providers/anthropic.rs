//! Anthropic Provider Implementation
//!
//! Implements the AIProvider trait over the Messages API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::ai::provider::{
    AIProvider, CompletionRequest, CompletionResponse, FinishReason, TokenUsage,
};
use crate::core::generative::provider_impls::http::{build_client, send_json};
use crate::core::settings::{CredentialKind, PipelineConfig};
use crate::core::{CoreError, CoreResult};

// =============================================================================
// Anthropic Provider
// =============================================================================

/// Anthropic API provider for Claude models
pub struct AnthropicProvider {
    api_key: String,
    base_url: String,
    default_model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .finish_non_exhaustive()
    }
}

impl AnthropicProvider {
    /// Default Anthropic API base URL
    pub const DEFAULT_BASE_URL: &'static str = "https://api.anthropic.com";

    /// API version header
    pub const API_VERSION: &'static str = "2023-06-01";

    /// Used when a request sets no token limit
    pub const DEFAULT_MAX_TOKENS: u32 = 4096;

    /// Creates a new Anthropic provider. An empty key is a configuration error.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> CoreResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(CoreError::ConfigurationMissing(
                CredentialKind::Anthropic.env_var().to_string(),
            ));
        }

        Ok(Self {
            api_key,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            default_model: model.into(),
            client: build_client(timeout)?,
        })
    }

    /// Builds the oracle from config; oracle calls get a longer timeout
    /// than provider status checks
    pub fn from_config(config: &PipelineConfig) -> CoreResult<Self> {
        let key = config.credentials.require(CredentialKind::Anthropic)?;
        let timeout = config.http_timeout().max(Duration::from_secs(120));
        Ok(Self::new(key, &config.oracle.model, timeout)?.with_base_url(&config.endpoints.anthropic))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

// =============================================================================
// Anthropic API Types
// =============================================================================

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    model: String,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: ApiUsage,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Deserialize, Default)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

fn into_completion(api_response: MessagesResponse) -> CompletionResponse {
    let text = api_response
        .content
        .iter()
        .filter(|block| block.content_type == "text")
        .filter_map(|block| block.text.as_deref())
        .collect::<Vec<_>>()
        .join("");

    let finish_reason = match api_response.stop_reason.as_deref() {
        Some("max_tokens") => FinishReason::Length,
        _ => FinishReason::Stop,
    };

    CompletionResponse {
        text,
        model: api_response.model,
        usage: TokenUsage::new(api_response.usage.input_tokens, api_response.usage.output_tokens),
        finish_reason,
    }
}

// =============================================================================
// AIProvider Implementation
// =============================================================================

#[async_trait]
impl AIProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: CompletionRequest) -> CoreResult<CompletionResponse> {
        let model = request.model.as_deref().unwrap_or(&self.default_model);

        let api_request = MessagesRequest {
            model,
            max_tokens: request.max_tokens.unwrap_or(Self::DEFAULT_MAX_TOKENS),
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
            system: request.system.as_deref(),
        };

        let api_response: MessagesResponse = send_json(
            "Anthropic",
            self.client
                .post(self.messages_url())
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", Self::API_VERSION)
                .header("Content-Type", "application/json")
                .json(&api_request),
        )
        .await?;

        let response = into_completion(api_response);
        debug!(
            "Anthropic completion: model={} tokens={}",
            response.model, response.usage.total_tokens
        );
        if response.finish_reason == FinishReason::Length {
            warn!("Anthropic completion hit max_tokens; output may be truncated");
        }
        Ok(response)
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> AnthropicProvider {
        AnthropicProvider::new("test-api-key", "claude-sonnet-4-5-20251015", Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn test_anthropic_provider_creation() {
        let provider = provider();
        assert_eq!(provider.name(), "anthropic");
        assert!(provider.is_available());
        assert_eq!(provider.messages_url(), "https://api.anthropic.com/v1/messages");
    }

    #[test]
    fn test_anthropic_provider_empty_key() {
        let result = AnthropicProvider::new("", "m", Duration::from_secs(5));
        assert!(matches!(result, Err(CoreError::ConfigurationMissing(ref v)) if v == "ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = PipelineConfig::default();
        assert!(AnthropicProvider::from_config(&config).is_err());

        let config = PipelineConfig::from_lookup(|k| {
            (k == "ANTHROPIC_API_KEY").then(|| "sk-ant-123456789".to_string())
        });
        let provider = AnthropicProvider::from_config(&config).unwrap();
        assert_eq!(provider.default_model(), "claude-sonnet-4-5-20251015");
    }

    #[test]
    fn test_request_serialization() {
        let request = MessagesRequest {
            model: "claude-sonnet-4-5-20251015",
            max_tokens: 2048,
            messages: vec![Message {
                role: "user",
                content: "Analyze",
            }],
            system: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_tokens"], 2048);
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("system").is_none());

        let with_role = MessagesRequest {
            system: Some("You are a trend analyst"),
            ..request
        };
        let json = serde_json::to_value(&with_role).unwrap();
        assert_eq!(json["system"], "You are a trend analyst");
    }

    #[test]
    fn test_response_text_joins_text_blocks() {
        let api: MessagesResponse = serde_json::from_str(
            r#"{
                "content": [
                    {"type": "text", "text": "[{\"a\":"},
                    {"type": "tool_use", "id": "t"},
                    {"type": "text", "text": "1}]"}
                ],
                "model": "claude-sonnet-4-5-20251015",
                "stop_reason": "max_tokens",
                "usage": {"input_tokens": 12, "output_tokens": 30}
            }"#,
        )
        .unwrap();

        let response = into_completion(api);
        assert_eq!(response.text, r#"[{"a":1}]"#);
        assert_eq!(response.finish_reason, FinishReason::Length);
        assert_eq!(response.usage.total_tokens, 42);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let provider = provider().with_base_url("http://127.0.0.1:1");
        let result = provider.complete(CompletionRequest::new("hi")).await;
        assert!(matches!(result, Err(CoreError::TransportError(_))));
    }
}
