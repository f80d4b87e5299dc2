//! TrendReel Core Type Definitions
//!
//! Data shared between pipeline stages: scraped posts, trend analysis,
//! creative concepts and prompt variants.

use serde::{Deserialize, Serialize};

// =============================================================================
// Platform
// =============================================================================

/// Social platform the trend data was collected from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Instagram,
    TikTok,
}

impl Platform {
    /// Human-facing label used inside model prompts
    pub fn label(&self) -> &'static str {
        match self {
            Platform::Instagram => "Instagram",
            Platform::TikTok => "TikTok",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Instagram => write!(f, "instagram"),
            Platform::TikTok => write!(f, "tiktok"),
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "instagram" | "ig" => Ok(Platform::Instagram),
            "tiktok" | "tt" => Ok(Platform::TikTok),
            _ => Err(format!("Unknown platform: {}", s)),
        }
    }
}

// =============================================================================
// Scraped Posts
// =============================================================================

/// Maximum caption length kept on a post record
pub const CAPTION_DISPLAY_LIMIT: usize = 500;

/// One scraped social post, normalized across platforms
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub id: Option<String>,
    pub short_code: Option<String>,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub likes_count: u64,
    pub comments_count: u64,
    pub caption: String,
    pub hashtags: Vec<String>,
    pub display_url: Option<String>,
    pub timestamp: Option<String>,
    pub url: Option<String>,
}

/// Truncates a caption to the display limit on a character boundary
pub fn truncate_caption(caption: &str, limit: usize) -> String {
    caption.chars().take(limit).collect()
}

// =============================================================================
// Trend Analysis
// =============================================================================

/// A recurring pattern observed across scraped posts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendPattern {
    pub pattern: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub frequency: String,
}

/// One section of the proposed video structure
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentSection {
    pub section: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub description: String,
}

/// Visual style descriptor for a proposal
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualStyle {
    #[serde(default)]
    pub aesthetic: String,
    #[serde(default)]
    pub lighting: String,
    #[serde(default)]
    pub color_palette: String,
    #[serde(default)]
    pub editing_style: String,
}

/// The single video proposal attached to an analysis
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoProposal {
    pub title: String,
    pub hook: String,
    #[serde(default)]
    pub content_structure: Vec<ContentSection>,
    #[serde(default)]
    pub visual_style: VisualStyle,
    #[serde(default)]
    pub hashtag_recommendations: Vec<String>,
    #[serde(default)]
    pub engagement_rationale: String,
}

/// Trend analysis derived from a batch of posts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub trend_patterns: Vec<TrendPattern>,
    #[serde(default)]
    pub key_insights: String,
    pub video_proposal: VideoProposal,
}

impl AnalysisResult {
    /// Formats the trend patterns as a bullet list for model prompts
    pub fn patterns_text(&self) -> String {
        self.trend_patterns
            .iter()
            .map(|p| format!("- {}: {} ({})", p.pattern, p.description, p.frequency))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// =============================================================================
// Concepts
// =============================================================================

/// One step of a concept's script outline
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    #[serde(default)]
    pub timestamp: String,
    pub action: String,
}

/// One creative unit fanned out to the video providers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_number: Option<u32>,
    pub title: String,
    #[serde(default)]
    pub angle: String,
    #[serde(default)]
    pub hook: String,
    #[serde(default)]
    pub script_outline: Vec<ScriptStep>,
    /// Visual generation prompt shared by every provider
    #[serde(default)]
    pub runway_prompt: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

impl Concept {
    /// Number of whitespace-separated words in the visual prompt
    pub fn prompt_word_count(&self) -> usize {
        self.runway_prompt.split_whitespace().count()
    }
}

/// A labeled visual prompt proposal
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PromptVariant {
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub prompt: String,
}

// =============================================================================
// Tests
// =============================================================================
