//! Pipeline Configuration
//!
//! Credentials, endpoint overrides and scrape tuning for the pipeline.
//! Built once (from the environment and/or a JSON file), normalized, and
//! passed by reference to every stage.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::core::{CoreError, CoreResult};

// =============================================================================
// Constants
// =============================================================================

/// Env var overriding the per-request network timeout
pub const HTTP_TIMEOUT_ENV: &str = "TRENDREEL_HTTP_TIMEOUT_SECS";

// =============================================================================
// Credentials
// =============================================================================

/// The third-party services that need a credential
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    Anthropic,
    Apify,
    Runway,
    Fal,
    Luma,
    HeyGen,
    Shotstack,
}

impl CredentialKind {
    pub const ALL: [CredentialKind; 7] = [
        CredentialKind::Anthropic,
        CredentialKind::Apify,
        CredentialKind::Runway,
        CredentialKind::Fal,
        CredentialKind::Luma,
        CredentialKind::HeyGen,
        CredentialKind::Shotstack,
    ];

    /// Environment variable the credential is read from
    pub fn env_var(&self) -> &'static str {
        match self {
            CredentialKind::Anthropic => "ANTHROPIC_API_KEY",
            CredentialKind::Apify => "APIFY_TOKEN",
            CredentialKind::Runway => "RUNWAYML_API_KEY",
            CredentialKind::Fal => "FAL_KEY",
            CredentialKind::Luma => "LUMAAI_API_KEY",
            CredentialKind::HeyGen => "HEYGEN_API_KEY",
            CredentialKind::Shotstack => "SHOTSTACK_API_KEY",
        }
    }
}

/// API keys for every external service. Empty strings count as missing.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub anthropic_api_key: Option<String>,
    pub apify_token: Option<String>,
    pub runway_api_key: Option<String>,
    pub fal_key: Option<String>,
    pub luma_api_key: Option<String>,
    pub heygen_api_key: Option<String>,
    pub shotstack_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("Credentials");
        for kind in CredentialKind::ALL {
            s.field(kind.env_var(), &self.get(kind).map(redact));
        }
        s.finish()
    }
}

impl Credentials {
    fn slot(&self, kind: CredentialKind) -> &Option<String> {
        match kind {
            CredentialKind::Anthropic => &self.anthropic_api_key,
            CredentialKind::Apify => &self.apify_token,
            CredentialKind::Runway => &self.runway_api_key,
            CredentialKind::Fal => &self.fal_key,
            CredentialKind::Luma => &self.luma_api_key,
            CredentialKind::HeyGen => &self.heygen_api_key,
            CredentialKind::Shotstack => &self.shotstack_api_key,
        }
    }

    fn slot_mut(&mut self, kind: CredentialKind) -> &mut Option<String> {
        match kind {
            CredentialKind::Anthropic => &mut self.anthropic_api_key,
            CredentialKind::Apify => &mut self.apify_token,
            CredentialKind::Runway => &mut self.runway_api_key,
            CredentialKind::Fal => &mut self.fal_key,
            CredentialKind::Luma => &mut self.luma_api_key,
            CredentialKind::HeyGen => &mut self.heygen_api_key,
            CredentialKind::Shotstack => &mut self.shotstack_api_key,
        }
    }

    /// Returns the credential if present and non-blank
    pub fn get(&self, kind: CredentialKind) -> Option<&str> {
        self.slot(kind)
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Returns the credential or `ConfigurationMissing` naming its env var
    pub fn require(&self, kind: CredentialKind) -> CoreResult<&str> {
        self.get(kind)
            .ok_or_else(|| CoreError::ConfigurationMissing(kind.env_var().to_string()))
    }

    /// Returns the credential or an empty string (adapters treat empty as unconfigured)
    pub fn get_or_empty(&self, kind: CredentialKind) -> String {
        self.get(kind).unwrap_or_default().to_string()
    }

    pub fn set(&mut self, kind: CredentialKind, value: impl Into<String>) {
        *self.slot_mut(kind) = Some(value.into());
    }
}

/// Masks a secret for logs: `abcd...wxyz`, or `****` when short
pub fn redact(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

// =============================================================================
// Endpoints
// =============================================================================

/// Base URLs for every external service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub anthropic: String,
    pub apify: String,
    pub runway: String,
    pub fal_queue: String,
    pub luma: String,
    pub heygen: String,
    pub shotstack: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            anthropic: "https://api.anthropic.com".to_string(),
            apify: "https://api.apify.com/v2".to_string(),
            runway: "https://api.dev.runwayml.com".to_string(),
            fal_queue: "https://queue.fal.run".to_string(),
            luma: "https://api.lumalabs.ai".to_string(),
            heygen: "https://api.heygen.com".to_string(),
            shotstack: "https://api.shotstack.io/edit/stage".to_string(),
        }
    }
}

impl Endpoints {
    fn trim_trailing_slashes(&mut self) {
        for url in [
            &mut self.anthropic,
            &mut self.apify,
            &mut self.runway,
            &mut self.fal_queue,
            &mut self.luma,
            &mut self.heygen,
            &mut self.shotstack,
        ] {
            while url.ends_with('/') {
                url.pop();
            }
        }
    }
}

// =============================================================================
// Scrape Settings
// =============================================================================

/// Tuning for the data-collection stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeSettings {
    /// Seconds between actor-run status checks
    pub poll_interval_secs: u64,
    /// Upper bound on a single actor run
    pub max_wait_secs: u64,
    /// Instagram results per content type
    pub max_posts: u32,
    /// TikTok results per hashtag
    pub results_per_page: u32,
    /// Instagram posts below this like count are dropped
    pub min_likes: u64,
    /// Dataset downloads get a longer timeout than status calls
    pub dataset_timeout_secs: u64,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            max_wait_secs: 300,
            max_posts: 50,
            results_per_page: 15,
            min_likes: 0,
            dataset_timeout_secs: 60,
        }
    }
}

// =============================================================================
// Oracle Settings
// =============================================================================

/// Language model parameters for the analysis and concept stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSettings {
    pub model: String,
    pub analysis_max_tokens: u32,
    pub proposals_max_tokens: u32,
    pub concept_max_tokens: u32,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5-20251015".to_string(),
            analysis_max_tokens: 2048,
            proposals_max_tokens: 4000,
            concept_max_tokens: 3000,
        }
    }
}

// =============================================================================
// Pipeline Config
// =============================================================================

fn default_http_timeout() -> u64 {
    30
}

/// Top-level configuration passed to every stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub credentials: Credentials,

    #[serde(default)]
    pub endpoints: Endpoints,

    /// Per-request network timeout for provider calls
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default)]
    pub scrape: ScrapeSettings,

    #[serde(default)]
    pub oracle: OracleSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            endpoints: Endpoints::default(),
            http_timeout_secs: default_http_timeout(),
            scrape: ScrapeSettings::default(),
            oracle: OracleSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Builds a config from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_overrides(lookup);
        config
    }

    /// Reads a JSON config file and normalizes it
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: PipelineConfig = serde_json::from_str(&content).map_err(|e| {
            CoreError::ValidationError(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;
        config.normalize();
        info!("Loaded pipeline config from {}", path.display());
        Ok(config)
    }

    /// Overlays non-empty values from `lookup` on top of the current config
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for kind in CredentialKind::ALL {
            if let Some(value) = lookup(kind.env_var()).filter(|v| !v.trim().is_empty()) {
                debug!("Credential {} set from environment", kind.env_var());
                self.credentials.set(kind, value.trim());
            }
        }

        if let Some(raw) = lookup(HTTP_TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.http_timeout_secs = secs,
                Err(_) => debug!("Ignoring non-numeric {}={}", HTTP_TIMEOUT_ENV, raw),
            }
        }

        self.normalize();
    }

    /// Clamps every tunable into its supported range
    pub fn normalize(&mut self) {
        self.http_timeout_secs = self.http_timeout_secs.clamp(5, 300);
        self.endpoints.trim_trailing_slashes();

        self.scrape.poll_interval_secs = self.scrape.poll_interval_secs.clamp(1, 60);
        self.scrape.max_wait_secs = self.scrape.max_wait_secs.clamp(10, 3600);
        self.scrape.max_posts = self.scrape.max_posts.clamp(1, 200);
        self.scrape.results_per_page = self.scrape.results_per_page.clamp(1, 50);
        self.scrape.dataset_timeout_secs = self.scrape.dataset_timeout_secs.clamp(5, 300);

        if self.oracle.model.trim().is_empty() {
            self.oracle.model = OracleSettings::default().model;
        }
        self.oracle.analysis_max_tokens = self.oracle.analysis_max_tokens.clamp(256, 16_000);
        self.oracle.proposals_max_tokens = self.oracle.proposals_max_tokens.clamp(256, 16_000);
        self.oracle.concept_max_tokens = self.oracle.concept_max_tokens.clamp(256, 16_000);
    }

    /// Per-request timeout as a `Duration`
    pub fn http_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http_timeout_secs)
    }
}

// =============================================================================
// Tests
// =============================================================================
