//! TikTok hashtag source

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use super::apify::ApifyClient;
use super::{count, hashtag_names, merge_batches, normalize_hashtags, scalar_to_string, DedupKey, PostSource};
use crate::core::settings::ScrapeSettings;
use crate::core::{truncate_caption, CoreResult, Platform, PostRecord, CAPTION_DISPLAY_LIMIT};

pub const TIKTOK_ACTOR: &str = "clockworks/tiktok-scraper";

/// One dataset item as produced by the TikTok actor
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
struct TikTokItem(Map<String, Value>);

impl TikTokItem {
    fn field(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    fn text(&self, key: &str) -> Option<String> {
        self.field(key).and_then(Value::as_str).map(str::to_string)
    }

    /// `covers` is an object with `default` or a list; older items only
    /// carry `videoMeta.coverUrl`
    fn cover(&self) -> Option<String> {
        match self.field("covers") {
            Some(Value::Object(map)) => map.get("default").and_then(Value::as_str).map(str::to_string),
            Some(Value::Array(list)) => list.first().and_then(Value::as_str).map(str::to_string),
            _ => self
                .field("videoMeta")
                .and_then(|meta| meta.get("coverUrl"))
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }

    fn into_record(self) -> PostRecord {
        PostRecord {
            id: scalar_to_string(self.field("id")),
            short_code: None,
            content_type: Some("Video".to_string()),
            likes_count: count(self.field("diggCount")),
            comments_count: count(self.field("commentCount")),
            caption: truncate_caption(&self.text("text").unwrap_or_default(), CAPTION_DISPLAY_LIMIT),
            hashtags: hashtag_names(self.field("hashtags")),
            display_url: self.cover(),
            timestamp: self.field("createTime").map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
            url: self.text("webVideoUrl"),
        }
    }
}

impl DedupKey for TikTokItem {
    fn dedup_key(&self) -> Option<String> {
        scalar_to_string(self.field("id"))
    }

    fn is_error_entry(&self) -> bool {
        self.0.contains_key("error")
    }
}

fn run_input(hashtag: &str, results_per_page: u32) -> Value {
    json!({
        "hashtags": [hashtag],
        "resultsPerPage": results_per_page,
        "proxyConfiguration": {"useApifyProxy": true},
    })
}

fn collect_posts(batches: Vec<Vec<TikTokItem>>) -> Vec<PostRecord> {
    merge_batches(batches)
        .into_iter()
        .map(TikTokItem::into_record)
        .collect()
}

// =============================================================================
// TikTokSource
// =============================================================================

/// Hashtag scrape, one run per hashtag
#[derive(Debug)]
pub struct TikTokSource {
    client: ApifyClient,
    results_per_page: u32,
}

impl TikTokSource {
    pub fn new(client: ApifyClient, settings: &ScrapeSettings) -> Self {
        Self {
            client,
            results_per_page: settings.results_per_page,
        }
    }
}

#[async_trait]
impl PostSource for TikTokSource {
    fn platform(&self) -> Platform {
        Platform::TikTok
    }

    async fn fetch_posts(&self, hashtags: &[String]) -> CoreResult<Vec<PostRecord>> {
        let hashtags = normalize_hashtags(hashtags)?;

        let mut batches = Vec::with_capacity(hashtags.len());
        for tag in &hashtags {
            let items: Vec<TikTokItem> = self
                .client
                .run_actor(TIKTOK_ACTOR, run_input(tag, self.results_per_page))
                .await?;
            info!("TikTok run for #{} returned {} items", tag, items.len());
            batches.push(items);
        }

        let posts = collect_posts(batches);
        info!("Collected {} TikTok posts for {:?}", posts.len(), hashtags);
        Ok(posts)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn items(value: Value) -> Vec<TikTokItem> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_run_input_shape() {
        let input = run_input("fyp", 15);
        assert_eq!(input["hashtags"], json!(["fyp"]));
        assert_eq!(input["resultsPerPage"], 15);
        assert_eq!(input["proxyConfiguration"]["useApifyProxy"], true);
    }

    #[test]
    fn test_field_normalization() {
        let records = collect_posts(vec![items(json!([{
            "id": "7301",
            "diggCount": 1200,
            "commentCount": 45,
            "text": "Desk tour",
            "hashtags": [{"name": "desksetup"}, {"name": "fyp"}],
            "covers": {"default": "https://p16/cover.jpg"},
            "createTime": 1700000000,
            "webVideoUrl": "https://www.tiktok.com/@a/video/7301"
        }]))]);

        let post = &records[0];
        assert_eq!(post.id.as_deref(), Some("7301"));
        assert_eq!(post.content_type.as_deref(), Some("Video"));
        assert_eq!(post.likes_count, 1200);
        assert_eq!(post.comments_count, 45);
        assert_eq!(post.caption, "Desk tour");
        assert_eq!(post.hashtags, vec!["desksetup", "fyp"]);
        assert_eq!(post.display_url.as_deref(), Some("https://p16/cover.jpg"));
        assert_eq!(post.timestamp.as_deref(), Some("1700000000"));
        assert_eq!(post.url.as_deref(), Some("https://www.tiktok.com/@a/video/7301"));
        assert!(post.short_code.is_none());
    }

    #[test]
    fn test_cover_fallbacks() {
        let records = collect_posts(vec![items(json!([
            {"id": 1, "covers": ["https://first.jpg", "https://second.jpg"]},
            {"id": 2, "videoMeta": {"coverUrl": "https://meta.jpg"}},
            {"id": 3}
        ]))]);

        assert_eq!(records[0].display_url.as_deref(), Some("https://first.jpg"));
        assert_eq!(records[1].display_url.as_deref(), Some("https://meta.jpg"));
        assert!(records[2].display_url.is_none());
    }

    #[test]
    fn test_merge_across_hashtags() {
        let records = collect_posts(vec![
            items(json!([{"id": "a"}, {"id": "b"}])),
            items(json!([{"id": "b"}, {"id": "c"}, {"error": "blocked"}])),
        ]);
        let ids: Vec<_> = records.iter().filter_map(|r| r.id.as_deref()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_source_takes_results_per_page_from_settings() {
        let client = ApifyClient::new(
            "tok",
            "http://127.0.0.1:1",
            std::time::Duration::from_secs(1),
            std::time::Duration::from_secs(1),
        )
        .unwrap();
        let settings = ScrapeSettings {
            results_per_page: 40,
            ..Default::default()
        };

        let source = TikTokSource::new(client, &settings);
        assert_eq!(source.results_per_page, 40);
        assert_eq!(source.platform(), Platform::TikTok);
    }
}
