//! Oracle output parsing
//!
//! Model responses are expected to be bare JSON but are sometimes wrapped
//! in a markdown fence.

use serde::de::DeserializeOwned;

use crate::core::{CoreError, CoreResult};

const FENCE: &str = "```";

/// Maximum excerpt of model output kept in parse errors
const MAX_EXCERPT_CHARS: usize = 200;

/// Strips a surrounding markdown code fence and an optional `json` tag
pub fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix(FENCE) else {
        return trimmed;
    };
    let inner = match rest.find(FENCE) {
        Some(end) => &rest[..end],
        None => rest,
    };
    inner.strip_prefix("json").unwrap_or(inner).trim()
}

/// Parses model output into `T`, after fence stripping
pub fn parse_json<T: DeserializeOwned>(raw: &str, what: &str) -> CoreResult<T> {
    let body = strip_fences(raw);
    serde_json::from_str(body).map_err(|e| {
        let excerpt: String = body.chars().take(MAX_EXCERPT_CHARS).collect();
        CoreError::AnalysisParseError(format!("{}: {} (output began: {:?})", what, e, excerpt))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_fences("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_fences("```\n[1,2]\n```\ntrailing note"), "[1,2]");
        assert_eq!(strip_fences("```json\n{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_fences("```JSON\n{}\n```"), "JSON\n{}");
    }

    #[test]
    fn test_parse_json_reports_parse_error() {
        let ok: Value = parse_json("```json\n{\"k\": true}\n```", "analysis").unwrap();
        assert_eq!(ok["k"], true);

        let err = parse_json::<Value>("Sure! Here is the JSON you asked for", "analysis").unwrap_err();
        match err {
            CoreError::AnalysisParseError(msg) => {
                assert!(msg.starts_with("analysis:"));
                assert!(msg.contains("Sure!"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
