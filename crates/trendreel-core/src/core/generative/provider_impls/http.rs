//! Shared HTTP plumbing for provider adapters

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use crate::core::{CoreError, CoreResult};

/// Maximum response body excerpt kept in error messages
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Builds a client with a fixed per-request timeout
pub fn build_client(timeout: Duration) -> CoreResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CoreError::Internal(format!("Failed to create HTTP client: {}", e)))
}

/// Sends a request and decodes a 2xx JSON body into `T`
pub async fn send_json<T: DeserializeOwned>(provider: &str, request: RequestBuilder) -> CoreResult<T> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(parse_api_error(provider, status, &body));
    }

    serde_json::from_str(&body).map_err(|e| {
        CoreError::UnexpectedResponse(format!("{} returned an unexpected payload: {}", provider, e))
    })
}

/// Converts a non-2xx response into a transport error with the best message
pub fn parse_api_error(provider: &str, status: StatusCode, body: &str) -> CoreError {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let detail = value
            .get("error")
            .or_else(|| value.get("detail"))
            .or_else(|| value.get("message"))
            .filter(|v| !v.is_null());
        if let Some(detail) = detail {
            return CoreError::TransportError(format!(
                "{} API error ({}): {}",
                provider,
                status,
                flatten_error(detail)
            ));
        }
    }

    let truncated: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    CoreError::TransportError(format!("{} API error ({}): {}", provider, status, truncated))
}

/// Flattens a provider error value: strings as-is, objects by `message` then
/// `msg`, anything else as compact JSON
pub fn flatten_error(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("message")
            .or_else(|| map.get("msg"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    }
}

/// Flattens an optional error value, falling back to `default`
pub fn error_or(value: Option<&Value>, default: &str) -> String {
    value
        .filter(|v| !v.is_null())
        .map(flatten_error)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_error_variants() {
        assert_eq!(flatten_error(&json!("quota exceeded")), "quota exceeded");
        assert_eq!(flatten_error(&json!({"message": "bad prompt", "code": 4})), "bad prompt");
        assert_eq!(flatten_error(&json!({"msg": "avatar missing"})), "avatar missing");
        assert_eq!(flatten_error(&json!({"code": 40012})), r#"{"code":40012}"#);
    }

    #[test]
    fn test_error_or_defaults() {
        assert_eq!(error_or(None, "Generation failed"), "Generation failed");
        assert_eq!(error_or(Some(&Value::Null), "Generation failed"), "Generation failed");
        assert_eq!(error_or(Some(&json!("")), "Generation failed"), "Generation failed");
        assert_eq!(error_or(Some(&json!("nsfw")), "Generation failed"), "nsfw");
    }

    #[test]
    fn test_parse_api_error_structured() {
        let body = r#"{"error":{"message":"Rate limit exceeded","code":"rate_limit"}}"#;
        let err = parse_api_error("RunwayML", StatusCode::TOO_MANY_REQUESTS, body);
        match err {
            CoreError::TransportError(msg) => {
                assert!(msg.contains("RunwayML"));
                assert!(msg.contains("429"));
                assert!(msg.contains("Rate limit exceeded"));
            }
            _ => panic!("Expected TransportError"),
        }
    }

    #[test]
    fn test_parse_api_error_unstructured() {
        let body = "x".repeat(2000);
        let err = parse_api_error("Luma", StatusCode::BAD_GATEWAY, &body);
        let msg = err.to_string();
        assert!(msg.contains("502"));
        assert!(msg.len() < 700);
    }
}
