//! Trend Analysis Stage
//!
//! Summarizes scraped posts for the oracle and parses the structured trend
//! analysis it returns.

use tracing::info;

use super::json::parse_json;
use super::provider::{AIProvider, CompletionRequest};
use crate::core::settings::OracleSettings;
use crate::core::{truncate_caption, AnalysisResult, CoreError, CoreResult, Platform, PostRecord};

/// Posts included in the prompt sample
pub const MAX_SAMPLE_POSTS: usize = 50;

/// Caption characters kept per sampled post
pub const SAMPLE_CAPTION_CHARS: usize = 300;

/// Aggregate engagement figures quoted in the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngagementStats {
    pub total: usize,
    pub average_likes: u64,
    pub top_likes: u64,
}

impl EngagementStats {
    pub fn from_posts(posts: &[PostRecord]) -> Self {
        let total = posts.len();
        let sum: u64 = posts.iter().map(|p| p.likes_count).sum();
        Self {
            total,
            average_likes: if total == 0 { 0 } else { sum / total as u64 },
            top_likes: posts.iter().map(|p| p.likes_count).max().unwrap_or(0),
        }
    }
}

/// One numbered block per post, capped at [`MAX_SAMPLE_POSTS`]
pub fn summarize_posts(posts: &[PostRecord]) -> String {
    posts
        .iter()
        .take(MAX_SAMPLE_POSTS)
        .enumerate()
        .map(|(i, p)| {
            format!(
                "{}. [{}] Likes: {} | Comments: {}\n   Caption: {}\n   Hashtags: {}",
                i + 1,
                p.content_type.as_deref().unwrap_or("unknown"),
                p.likes_count,
                p.comments_count,
                truncate_caption(&p.caption, SAMPLE_CAPTION_CHARS),
                p.hashtags.join(" ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn analyst_role(platform: Platform) -> String {
    format!(
        "You are a senior {} content strategist who studies what makes posts trend.",
        platform.label()
    )
}

fn analysis_prompt(posts: &[PostRecord], hashtags: &[String], platform: Platform) -> String {
    let stats = EngagementStats::from_posts(posts);
    format!(
        r#"Scraped {total} {label} posts for: {tags}
- Average likes: {avg}
- Most-liked post: {top} likes

Sample of up to {max} posts:

{summary}

Study the sample and answer with one JSON object shaped exactly like this:

{{
  "trend_patterns": [
    {{
      "pattern": "short pattern name",
      "description": "what the pattern is and why it lands",
      "frequency": "how widespread it is (e.g. about 60% of the top posts)"
    }}
  ],
  "key_insights": "two or three sentences pulling the patterns together",
  "video_proposal": {{
    "title": "working title for the video",
    "hook": "the opening line or image for the first 3 seconds",
    "content_structure": [
      {{
        "section": "section name (Intro, Problem, Demo, CTA ...)",
        "duration": "e.g. 0-5 sec",
        "description": "what happens in the section"
      }}
    ],
    "visual_style": {{
      "aesthetic": "overall look (raw and authentic, polished and cinematic ...)",
      "lighting": "lighting approach",
      "color_palette": "palette",
      "editing_style": "pacing and cutting notes"
    }},
    "hashtag_recommendations": ["tag1", "tag2", "tag3"],
    "engagement_rationale": "why the data suggests this will perform"
  }}
}}

Output the JSON object only, without markdown or commentary."#,
        label = platform.label(),
        total = stats.total,
        tags = hashtags.join(", "),
        avg = stats.average_likes,
        top = stats.top_likes,
        max = MAX_SAMPLE_POSTS,
        summary = summarize_posts(posts),
    )
}

/// Asks the oracle for a trend analysis of the scraped posts
pub async fn analyze_posts(
    oracle: &dyn AIProvider,
    settings: &OracleSettings,
    posts: &[PostRecord],
    hashtags: &[String],
    platform: Platform,
) -> CoreResult<AnalysisResult> {
    if posts.is_empty() {
        return Err(CoreError::ValidationError(
            "No posts to analyze; try other hashtags or a lower like threshold".to_string(),
        ));
    }

    let request = CompletionRequest::new(analysis_prompt(posts, hashtags, platform))
        .with_system(analyst_role(platform))
        .with_model(&settings.model)
        .with_max_tokens(settings.analysis_max_tokens);
    let response = oracle.complete(request).await?;

    let analysis: AnalysisResult = parse_json(&response.text, "trend analysis")?;
    info!(
        "Analyzed {} {} posts: {} patterns, proposal '{}'",
        posts.len(),
        platform,
        analysis.trend_patterns.len(),
        analysis.video_proposal.title
    );
    Ok(analysis)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ai::provider::MockAIProvider;

    const ANALYSIS_FIXTURE: &str = r#"```json
{
  "trend_patterns": [{"pattern": "Before/after", "description": "Messy to clean", "frequency": "~60%"}],
  "key_insights": "Transformations win.",
  "video_proposal": {
    "title": "Desk Setup Reveal",
    "hook": "This desk used to be a disaster",
    "content_structure": [{"section": "Intro", "duration": "0-3s", "description": "Messy desk"}],
    "visual_style": {"aesthetic": "cozy", "lighting": "warm", "color_palette": "walnut", "editing_style": "slow"},
    "hashtag_recommendations": ["desksetup"],
    "engagement_rationale": "Reveals drive saves."
  }
}
```"#;

    fn post(likes: u64, caption: &str) -> PostRecord {
        PostRecord {
            id: Some(likes.to_string()),
            content_type: Some("Video".to_string()),
            likes_count: likes,
            comments_count: 2,
            caption: caption.to_string(),
            hashtags: vec!["#desk".to_string(), "#setup".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_engagement_stats() {
        let stats = EngagementStats::from_posts(&[post(100, ""), post(301, ""), post(50, "")]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.average_likes, 150);
        assert_eq!(stats.top_likes, 301);

        let empty = EngagementStats::from_posts(&[]);
        assert_eq!(empty.average_likes, 0);
        assert_eq!(empty.top_likes, 0);
    }

    #[test]
    fn test_summary_caps_posts_and_captions() {
        let posts: Vec<_> = (0..60).map(|i| post(i, &"c".repeat(400))).collect();
        let summary = summarize_posts(&posts);

        assert!(summary.starts_with("1. [Video] Likes: 0 | Comments: 2"));
        assert!(summary.contains("\n\n50. [Video]"));
        assert!(!summary.contains("51. [Video]"));
        assert!(summary.contains(&format!("Caption: {}\n", "c".repeat(300))));
        assert!(summary.contains("Hashtags: #desk #setup"));
    }

    #[tokio::test]
    async fn test_analyze_posts_parses_fenced_output() {
        let oracle = MockAIProvider::new("mock").with_response(ANALYSIS_FIXTURE);
        let settings = OracleSettings::default();

        let analysis = analyze_posts(
            &oracle,
            &settings,
            &[post(10, "a"), post(20, "b")],
            &["desksetup".to_string()],
            Platform::TikTok,
        )
        .await
        .unwrap();

        assert_eq!(analysis.video_proposal.title, "Desk Setup Reveal");
        assert_eq!(analysis.trend_patterns.len(), 1);

        let request = &oracle.requests()[0];
        assert_eq!(request.max_tokens, Some(settings.analysis_max_tokens));
        assert!(request.prompt.contains("Scraped 2 TikTok posts for: desksetup"));
        assert!(request.prompt.contains("Average likes: 15"));
        assert!(request.prompt.contains("Most-liked post: 20 likes"));
        assert_eq!(
            request.system.as_deref(),
            Some("You are a senior TikTok content strategist who studies what makes posts trend.")
        );
    }

    #[tokio::test]
    async fn test_analyze_posts_rejects_prose() {
        let oracle = MockAIProvider::new("mock").with_response("I could not find any trends.");
        let result = analyze_posts(
            &oracle,
            &OracleSettings::default(),
            &[post(1, "a")],
            &["x".to_string()],
            Platform::Instagram,
        )
        .await;
        assert!(matches!(result, Err(CoreError::AnalysisParseError(_))));
    }

    #[tokio::test]
    async fn test_analyze_posts_requires_posts() {
        let oracle = MockAIProvider::new("mock");
        let result = analyze_posts(
            &oracle,
            &OracleSettings::default(),
            &[],
            &["x".to_string()],
            Platform::Instagram,
        )
        .await;
        assert!(matches!(result, Err(CoreError::ValidationError(_))));
        assert!(oracle.requests().is_empty());
    }
}
