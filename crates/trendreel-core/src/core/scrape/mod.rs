//! Data Collection
//!
//! Scraper-backed post sources. Each source starts one remote actor run per
//! content category, polls it with [`run_to_completion`], and merges the
//! resulting batches into normalized [`PostRecord`]s.
//!
//! [`run_to_completion`]: crate::core::jobs::run_to_completion

mod apify;
mod instagram;
mod tiktok;

pub use apify::{ActorRun, ApifyClient};
pub use instagram::{ContentType, InstagramSource, INSTAGRAM_ACTOR};
pub use tiktok::{TikTokSource, TIKTOK_ACTOR};

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;

use crate::core::settings::PipelineConfig;
use crate::core::{CoreError, CoreResult, Platform, PostRecord};

// =============================================================================
// Post Source
// =============================================================================

/// A platform-specific source of scraped posts
#[async_trait]
pub trait PostSource: Send + Sync {
    fn platform(&self) -> Platform;

    /// Collects, merges and normalizes posts for the given hashtags
    async fn fetch_posts(&self, hashtags: &[String]) -> CoreResult<Vec<PostRecord>>;
}

/// Builds the source for a platform. Fails before any network call when the
/// scraper token is missing.
pub fn source_for(
    config: &PipelineConfig,
    platform: Platform,
    content_types: &[ContentType],
) -> CoreResult<Box<dyn PostSource>> {
    let client = ApifyClient::from_config(config)?;
    let source: Box<dyn PostSource> = match platform {
        Platform::Instagram => Box::new(InstagramSource::new(client, &config.scrape, content_types)),
        Platform::TikTok => Box::new(TikTokSource::new(client, &config.scrape)),
    };
    Ok(source)
}

/// Trims hashtags and strips a leading `#`. At least one must remain.
pub fn normalize_hashtags(hashtags: &[String]) -> CoreResult<Vec<String>> {
    let cleaned: Vec<String> = hashtags
        .iter()
        .map(|tag| tag.trim().trim_start_matches('#').trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect();

    if cleaned.is_empty() {
        return Err(CoreError::ValidationError(
            "At least one hashtag is required".to_string(),
        ));
    }
    Ok(cleaned)
}

// =============================================================================
// Batch Merge
// =============================================================================

/// Identity used when merging scraper batches
pub trait DedupKey {
    /// Stable identifier; `None` entries are always kept
    fn dedup_key(&self) -> Option<String>;

    /// Whether the scraper flagged this entry as an error
    fn is_error_entry(&self) -> bool {
        false
    }
}

impl DedupKey for String {
    fn dedup_key(&self) -> Option<String> {
        Some(self.clone())
    }
}

/// Concatenates batches, dropping error entries and later duplicates.
/// Order is first-seen.
pub fn merge_batches<T: DedupKey>(batches: Vec<Vec<T>>) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for item in batches.into_iter().flatten() {
        if item.is_error_entry() {
            continue;
        }
        match item.dedup_key() {
            Some(key) if !key.is_empty() => {
                if seen.insert(key) {
                    merged.push(item);
                }
            }
            _ => merged.push(item),
        }
    }
    merged
}

// =============================================================================
// Raw Value Helpers
// =============================================================================

/// Renders a scalar id (string or number) as a string
pub(crate) fn scalar_to_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads a non-negative count; scrapers report hidden counts as -1
pub(crate) fn count(value: Option<&Value>) -> u64 {
    value
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
        .map(|n| n.max(0) as u64)
        .unwrap_or(0)
}

/// Hashtag entries come as plain strings or `{ "name": ... }` objects
pub(crate) fn hashtag_names(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| match item {
            Value::Object(map) => map
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
