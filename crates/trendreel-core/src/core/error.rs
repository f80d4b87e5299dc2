//! TrendReel Error Definitions
//!
//! Defines error types used throughout the project.

use thiserror::Error;

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Provider Errors
    // =========================================================================
    /// Network failure, timeout or non-2xx response from a third-party call.
    /// Adapters fold this into an `error` task instead of propagating it.
    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    // =========================================================================
    // Job Errors
    // =========================================================================
    #[error("Job {job_id} ended with status {state}")]
    JobFailed { job_id: String, state: String },

    #[error("Job {job_id} did not finish within {waited_secs} seconds")]
    JobTimedOut { job_id: String, waited_secs: u64 },

    // =========================================================================
    // Language Model Errors
    // =========================================================================
    #[error("Failed to parse model output: {0}")]
    AnalysisParseError(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("{0} not configured")]
    ConfigurationMissing(String),

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CoreError::TransportError(format!("Request timed out: {}", e))
        } else {
            CoreError::TransportError(format!("Network error: {}", e))
        }
    }
}

impl CoreError {
    /// Whether the failure happened before any network call was made
    pub fn is_configuration(&self) -> bool {
        matches!(self, CoreError::ConfigurationMissing(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::ConfigurationMissing("FAL_KEY".to_string());
        assert_eq!(err.to_string(), "FAL_KEY not configured");
        assert!(err.is_configuration());

        let err = CoreError::JobFailed {
            job_id: "run-1".to_string(),
            state: "ABORTED".to_string(),
        };
        assert_eq!(err.to_string(), "Job run-1 ended with status ABORTED");
        assert!(!err.is_configuration());

        let err = CoreError::JobTimedOut {
            job_id: "run-2".to_string(),
            waited_secs: 300,
        };
        assert!(err.to_string().contains("300 seconds"));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: CoreError = parse.unwrap_err().into();
        assert!(matches!(err, CoreError::JsonError(_)));
    }
}
