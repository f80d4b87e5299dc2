//! Instagram hashtag source

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

use super::apify::ApifyClient;
use super::{count, hashtag_names, merge_batches, normalize_hashtags, scalar_to_string, DedupKey, PostSource};
use crate::core::settings::ScrapeSettings;
use crate::core::{truncate_caption, CoreResult, Platform, PostRecord, CAPTION_DISPLAY_LIMIT};

pub const INSTAGRAM_ACTOR: &str = "apify~instagram-scraper";

/// Instagram result category; one actor run is started per category
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Posts,
    Reels,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Posts => "posts",
            ContentType::Reels => "reels",
        }
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "posts" | "post" => Ok(ContentType::Posts),
            "reels" | "reel" => Ok(ContentType::Reels),
            _ => Err(format!("Unknown content type: {}", s)),
        }
    }
}

// =============================================================================
// Raw Items
// =============================================================================

/// One dataset item as produced by the Instagram actor
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
struct InstagramItem(Map<String, Value>);

impl InstagramItem {
    fn field(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    fn text(&self, key: &str) -> Option<String> {
        self.field(key).and_then(Value::as_str).map(str::to_string)
    }

    fn likes(&self) -> u64 {
        count(self.field("likesCount"))
    }

    fn into_record(self) -> PostRecord {
        let short_code = self.text("shortCode").filter(|s| !s.is_empty());
        let url = self
            .text("url")
            .filter(|u| !u.is_empty())
            .or_else(|| {
                short_code
                    .as_ref()
                    .map(|code| format!("https://www.instagram.com/p/{}/", code))
            });

        PostRecord {
            id: scalar_to_string(self.field("id")),
            short_code,
            content_type: self.text("type"),
            likes_count: self.likes(),
            comments_count: count(self.field("commentsCount")),
            caption: truncate_caption(
                &self.text("caption").unwrap_or_default(),
                CAPTION_DISPLAY_LIMIT,
            ),
            hashtags: hashtag_names(self.field("hashtags")),
            display_url: self.text("displayUrl"),
            timestamp: self.text("timestamp"),
            url,
        }
    }
}

impl DedupKey for InstagramItem {
    fn dedup_key(&self) -> Option<String> {
        scalar_to_string(self.field("id")).or_else(|| scalar_to_string(self.field("shortCode")))
    }

    fn is_error_entry(&self) -> bool {
        self.0.contains_key("error")
    }
}

fn explore_url(tag: &str) -> String {
    format!("https://www.instagram.com/explore/tags/{}/", tag)
}

fn run_input(hashtags: &[String], content_type: ContentType, max_posts: u32) -> Value {
    let direct_urls: Vec<String> = hashtags.iter().map(|t| explore_url(t)).collect();
    json!({
        "directUrls": direct_urls,
        "resultsType": content_type.as_str(),
        "resultsLimit": max_posts,
        "proxy": {"useApifyProxy": true},
    })
}

/// Merges per-category batches and applies the like threshold
fn collect_posts(batches: Vec<Vec<InstagramItem>>, min_likes: u64) -> Vec<PostRecord> {
    let filtered = batches
        .into_iter()
        .map(|batch| batch.into_iter().filter(|item| item.likes() >= min_likes).collect())
        .collect();
    merge_batches(filtered)
        .into_iter()
        .map(InstagramItem::into_record)
        .collect()
}

// =============================================================================
// InstagramSource
// =============================================================================

/// Hashtag explore-page scrape, one run per content type
#[derive(Debug)]
pub struct InstagramSource {
    client: ApifyClient,
    content_types: Vec<ContentType>,
    max_posts: u32,
    min_likes: u64,
}

impl InstagramSource {
    /// Empty `content_types` means posts and reels
    pub fn new(client: ApifyClient, settings: &ScrapeSettings, content_types: &[ContentType]) -> Self {
        let content_types = if content_types.is_empty() {
            vec![ContentType::Posts, ContentType::Reels]
        } else {
            content_types.to_vec()
        };
        Self {
            client,
            content_types,
            max_posts: settings.max_posts,
            min_likes: settings.min_likes,
        }
    }
}

#[async_trait]
impl PostSource for InstagramSource {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    async fn fetch_posts(&self, hashtags: &[String]) -> CoreResult<Vec<PostRecord>> {
        let hashtags = normalize_hashtags(hashtags)?;

        let mut batches = Vec::with_capacity(self.content_types.len());
        for content_type in &self.content_types {
            let input = run_input(&hashtags, *content_type, self.max_posts);
            let items: Vec<InstagramItem> = self.client.run_actor(INSTAGRAM_ACTOR, input).await?;
            info!("Instagram {} run returned {} items", content_type.as_str(), items.len());
            batches.push(items);
        }

        let posts = collect_posts(batches, self.min_likes);
        info!("Collected {} Instagram posts for {:?}", posts.len(), hashtags);
        Ok(posts)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn items(value: Value) -> Vec<InstagramItem> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_run_input_shape() {
        let input = run_input(&["desksetup".to_string()], ContentType::Reels, 25);
        assert_eq!(
            input["directUrls"][0],
            "https://www.instagram.com/explore/tags/desksetup/"
        );
        assert_eq!(input["resultsType"], "reels");
        assert_eq!(input["resultsLimit"], 25);
        assert_eq!(input["proxy"]["useApifyProxy"], true);
    }

    #[test]
    fn test_collect_filters_merges_and_normalizes() {
        let posts = items(json!([
            {"id": "1", "shortCode": "AAA", "type": "Image", "likesCount": 500,
             "commentsCount": 12, "caption": "Clean desk", "hashtags": ["desksetup"],
             "displayUrl": "https://cdn/1.jpg", "timestamp": "2025-01-01T00:00:00Z"},
            {"id": "2", "likesCount": 3},
            {"error": "no_items", "errorDescription": "Empty page"}
        ]));
        let reels = items(json!([
            {"id": "1", "likesCount": 500},
            {"shortCode": "CCC", "likesCount": 900, "caption": null, "hashtags": null},
            {"likesCount": -1}
        ]));

        let records = collect_posts(vec![posts, reels], 100);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id.as_deref(), Some("1"));
        assert_eq!(records[0].url.as_deref(), Some("https://www.instagram.com/p/AAA/"));
        assert_eq!(records[0].comments_count, 12);
        assert_eq!(records[0].hashtags, vec!["desksetup"]);
        assert_eq!(records[1].short_code.as_deref(), Some("CCC"));
        assert_eq!(records[1].caption, "");
        assert!(records[1].hashtags.is_empty());
    }

    #[test]
    fn test_items_without_identity_are_kept() {
        let records = collect_posts(
            vec![items(json!([{"likesCount": 5}, {"likesCount": 5}]))],
            0,
        );
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.url.is_none()));
    }

    #[test]
    fn test_long_caption_truncated() {
        let caption = "x".repeat(900);
        let records = collect_posts(vec![items(json!([{"id": "9", "caption": caption}]))], 0);
        assert_eq!(records[0].caption.chars().count(), CAPTION_DISPLAY_LIMIT);
    }

    #[test]
    fn test_content_type_parsing() {
        assert_eq!("Reels".parse::<ContentType>().unwrap(), ContentType::Reels);
        assert_eq!("post".parse::<ContentType>().unwrap(), ContentType::Posts);
        assert!("stories".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_source_takes_limits_from_settings() {
        let client = ApifyClient::new(
            "tok",
            "http://127.0.0.1:1",
            std::time::Duration::from_secs(1),
            std::time::Duration::from_secs(1),
        )
        .unwrap();
        let settings = ScrapeSettings {
            max_posts: 20,
            min_likes: 100,
            ..Default::default()
        };

        let source = InstagramSource::new(client, &settings, &[]);
        assert_eq!(source.content_types, vec![ContentType::Posts, ContentType::Reels]);
        assert_eq!(source.max_posts, 20);
        assert_eq!(source.min_likes, 100);

        let reels_only = InstagramSource::new(source.client, &settings, &[ContentType::Reels]);
        assert_eq!(reels_only.content_types, vec![ContentType::Reels]);
    }
}
