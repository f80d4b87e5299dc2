//! Composite Timeline Builder
//!
//! Deterministically turns a [`CompositeSpec`] into a render document for the
//! compositing service: a looped muted background, the chroma-keyed avatar,
//! a fading hook caption and a low-volume music bed.

use serde::{Deserialize, Serialize};

use crate::core::generative::provider_impls::heygen::GREEN_SCREEN;

// =============================================================================
// Constants
// =============================================================================

/// Length of one generated background clip
pub const BACKGROUND_SEGMENT_SECS: f64 = 10.0;

/// How long the hook caption stays on screen
pub const CAPTION_SECS: f64 = 3.5;

pub const MUSIC_VOLUME: f64 = 0.12;

/// Narration pace used for duration estimates
const WORDS_PER_SECOND: f64 = 2.5;

const MIN_COMPOSITE_SECS: f64 = 15.0;
const MAX_COMPOSITE_SECS: f64 = 60.0;
const EMPTY_SCRIPT_SECS: f64 = 30.0;

const CAPTION_CSS: &str = "p { font-family: 'Open Sans', sans-serif; color: #ffffff; \
font-size: 38px; font-weight: 800; text-shadow: 2px 2px 6px rgba(0,0,0,0.9); \
text-align: center; padding: 12px 20px; line-height: 1.3; }";

// =============================================================================
// Music Catalog
// =============================================================================

/// Static background music entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MusicTrack {
    pub id: &'static str,
    pub name: &'static str,
    pub url: &'static str,
}

pub const DEFAULT_MUSIC_ID: &str = "hype";

pub const MUSIC_TRACKS: [MusicTrack; 5] = [
    MusicTrack {
        id: "hype",
        name: "🔥 Hype",
        url: "https://shotstack-assets.s3-ap-southeast-2.amazonaws.com/music/unminus/lit.mp3",
    },
    MusicTrack {
        id: "chill",
        name: "❄️ Chill",
        url: "https://shotstack-assets.s3-ap-southeast-2.amazonaws.com/music/unminus/palmtrees.mp3",
    },
    MusicTrack {
        id: "motivational",
        name: "💪 Motivational",
        url: "https://shotstack-assets.s3-ap-southeast-2.amazonaws.com/music/unminus/sugar.mp3",
    },
    MusicTrack {
        id: "corporate",
        name: "💼 Corporate",
        url: "https://shotstack-assets.s3-ap-southeast-2.amazonaws.com/music/unminus/dreams.mp3",
    },
    MusicTrack {
        id: "dramatic",
        name: "🎬 Dramatic",
        url: "https://shotstack-assets.s3-ap-southeast-2.amazonaws.com/music/unminus/ambition.mp3",
    },
];

/// Catalog listing entry (id and display name only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicListing {
    pub id: String,
    pub name: String,
}

/// Lists the catalog in fixed order
pub fn music_tracks() -> Vec<MusicListing> {
    MUSIC_TRACKS
        .iter()
        .map(|t| MusicListing {
            id: t.id.to_string(),
            name: t.name.to_string(),
        })
        .collect()
}

/// Looks up a track, falling back to the default for unknown ids
pub fn resolve_music(id: &str) -> &'static MusicTrack {
    MUSIC_TRACKS
        .iter()
        .find(|t| t.id == id)
        .or_else(|| MUSIC_TRACKS.iter().find(|t| t.id == DEFAULT_MUSIC_ID))
        .unwrap_or(&MUSIC_TRACKS[0])
}

// =============================================================================
// Composite Spec
// =============================================================================

/// Inputs for one composite render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeSpec {
    pub avatar_video_url: String,
    pub background_video_url: String,
    /// Hook text shown as the opening caption
    pub caption: String,
    #[serde(default = "default_music_id")]
    pub music_track_id: String,
    pub duration_secs: f64,
}

fn default_music_id() -> String {
    DEFAULT_MUSIC_ID.to_string()
}

impl CompositeSpec {
    pub fn validate(&self) -> Result<(), String> {
        if self.avatar_video_url.trim().is_empty() {
            return Err("Avatar video URL cannot be empty".to_string());
        }
        if self.background_video_url.trim().is_empty() {
            return Err("Background video URL cannot be empty".to_string());
        }
        if !self.duration_secs.is_finite() || self.duration_secs <= 0.0 {
            return Err(format!(
                "Composite duration must be positive, got {}",
                self.duration_secs
            ));
        }
        Ok(())
    }
}

/// Estimates narration length: ~2.5 words/s rounded up, clamped to 15..=60 s;
/// 30 s for an empty script
pub fn estimate_composite_duration(spoken_script: &str) -> f64 {
    let words = spoken_script.split_whitespace().count();
    if words == 0 {
        return EMPTY_SCRIPT_SECS;
    }
    (words as f64 / WORDS_PER_SECOND)
        .ceil()
        .clamp(MIN_COMPOSITE_SECS, MAX_COMPOSITE_SECS)
}

// =============================================================================
// Render Document
// =============================================================================

/// Full render request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineDoc {
    pub timeline: Timeline,
    pub output: RenderOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub background: String,
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub clips: Vec<Clip>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Clip {
    pub asset: Asset,
    pub start: f64,
    pub length: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<Offset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<Transition>,
}

impl Clip {
    fn new(asset: Asset, start: f64, length: f64) -> Self {
        Self {
            asset,
            start,
            length,
            fit: None,
            position: None,
            offset: None,
            transition: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Asset {
    Video {
        src: String,
        volume: f64,
        #[serde(rename = "chromaKey", skip_serializing_if = "Option::is_none")]
        chroma_key: Option<ChromaKey>,
    },
    Html {
        html: String,
        css: String,
        width: u32,
        height: u32,
    },
    Audio {
        src: String,
        volume: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChromaKey {
    pub color: String,
    pub threshold: f64,
    pub feather: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Offset {
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub out: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOutput {
    pub format: String,
    pub resolution: String,
    pub aspect_ratio: String,
    pub fps: u32,
    pub size: RenderSize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

impl Default for RenderOutput {
    fn default() -> Self {
        Self {
            format: "mp4".to_string(),
            resolution: "hd".to_string(),
            aspect_ratio: "9:16".to_string(),
            fps: 30,
            size: RenderSize {
                width: 720,
                height: 1280,
            },
        }
    }
}

// =============================================================================
// Builders
// =============================================================================

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `(start, length)` pairs covering `duration` with `segment`-long clips; the
/// last one is clipped to the remainder
pub fn background_segments(duration: f64, segment: f64) -> Vec<(f64, f64)> {
    let mut segments = Vec::new();
    if segment <= 0.0 || !duration.is_finite() {
        return segments;
    }
    let mut t = 0.0;
    while duration - t > 1e-9 {
        let length = segment.min(duration - t);
        segments.push((round2(t), round2(length)));
        t += length;
    }
    segments
}

/// Escapes text for embedding in the caption HTML
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Builds the four-track render document for a composite
pub fn build_timeline(spec: &CompositeSpec) -> TimelineDoc {
    let duration = spec.duration_secs;

    let background_clips = background_segments(duration, BACKGROUND_SEGMENT_SECS)
        .into_iter()
        .map(|(start, length)| Clip {
            fit: Some("cover".to_string()),
            ..Clip::new(
                Asset::Video {
                    src: spec.background_video_url.clone(),
                    volume: 0.0,
                    chroma_key: None,
                },
                start,
                length,
            )
        })
        .collect();

    let avatar_clip = Clip {
        fit: Some("contain".to_string()),
        position: Some("center".to_string()),
        ..Clip::new(
            Asset::Video {
                src: spec.avatar_video_url.clone(),
                volume: 1.0,
                chroma_key: Some(ChromaKey {
                    color: GREEN_SCREEN.to_string(),
                    threshold: 0.3,
                    feather: 0.02,
                }),
            },
            0.0,
            duration,
        )
    };

    let caption_clip = Clip {
        position: Some("bottom".to_string()),
        offset: Some(Offset { y: 0.15 }),
        transition: Some(Transition {
            out: "fade".to_string(),
        }),
        ..Clip::new(
            Asset::Html {
                html: format!("<p>{}</p>", escape_html(&spec.caption)),
                css: CAPTION_CSS.to_string(),
                width: 640,
                height: 220,
            },
            0.0,
            CAPTION_SECS,
        )
    };

    let music_clip = Clip::new(
        Asset::Audio {
            src: resolve_music(&spec.music_track_id).url.to_string(),
            volume: MUSIC_VOLUME,
        },
        0.0,
        duration,
    );

    TimelineDoc {
        timeline: Timeline {
            background: "#000000".to_string(),
            tracks: vec![
                Track {
                    clips: background_clips,
                },
                Track {
                    clips: vec![avatar_clip],
                },
                Track {
                    clips: vec![caption_clip],
                },
                Track {
                    clips: vec![music_clip],
                },
            ],
        },
        output: RenderOutput::default(),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(duration: f64) -> CompositeSpec {
        CompositeSpec {
            avatar_video_url: "https://heygen.cdn/avatar.mp4".to_string(),
            background_video_url: "https://runway.cdn/bg.mp4".to_string(),
            caption: "Stop scrolling".to_string(),
            music_track_id: "chill".to_string(),
            duration_secs: duration,
        }
    }

    #[test]
    fn test_music_catalog() {
        let tracks = music_tracks();
        let ids: Vec<_> = tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["hype", "chill", "motivational", "corporate", "dramatic"]);
        assert!(MUSIC_TRACKS
            .iter()
            .all(|t| t.url.starts_with("https://shotstack-assets.s3-ap-southeast-2.amazonaws.com/music/unminus/")));
    }

    #[test]
    fn test_unknown_music_falls_back_to_default() {
        assert_eq!(resolve_music("polka").url, resolve_music("hype").url);
        assert!(resolve_music("polka").url.ends_with("/lit.mp3"));
        assert!(resolve_music("dramatic").url.ends_with("/ambition.mp3"));
    }

    #[test]
    fn test_background_segments_loop() {
        let segments = background_segments(25.0, 10.0);
        let starts: Vec<f64> = segments.iter().map(|s| s.0).collect();
        let lengths: Vec<f64> = segments.iter().map(|s| s.1).collect();
        assert_eq!(starts, vec![0.0, 10.0, 20.0]);
        assert_eq!(lengths, vec![10.0, 10.0, 5.0]);

        assert_eq!(background_segments(30.0, 10.0).len(), 3);
        assert_eq!(background_segments(7.5, 10.0), vec![(0.0, 7.5)]);
        assert!(background_segments(0.0, 10.0).is_empty());
    }

    #[test]
    fn test_timeline_tracks() {
        let doc = build_timeline(&spec(25.0));
        let json = serde_json::to_value(&doc).unwrap();
        let tracks = json["timeline"]["tracks"].as_array().unwrap();

        assert_eq!(json["timeline"]["background"], "#000000");
        assert_eq!(tracks.len(), 4);

        let bg = tracks[0]["clips"].as_array().unwrap();
        assert_eq!(bg.len(), 3);
        assert_eq!(bg[0]["asset"]["type"], "video");
        assert_eq!(bg[0]["asset"]["volume"], 0.0);
        assert_eq!(bg[0]["fit"], "cover");
        assert!(bg[0]["asset"].get("chromaKey").is_none());
        assert_eq!(bg[2]["length"], 5.0);

        let avatar = &tracks[1]["clips"][0];
        assert_eq!(avatar["asset"]["chromaKey"]["color"], "#00FF00");
        assert_eq!(avatar["asset"]["chromaKey"]["threshold"], 0.3);
        assert_eq!(avatar["asset"]["volume"], 1.0);
        assert_eq!(avatar["fit"], "contain");
        assert_eq!(avatar["position"], "center");
        assert_eq!(avatar["length"], 25.0);

        let caption = &tracks[2]["clips"][0];
        assert_eq!(caption["asset"]["type"], "html");
        assert_eq!(caption["asset"]["html"], "<p>Stop scrolling</p>");
        assert_eq!(caption["length"], 3.5);
        assert_eq!(caption["position"], "bottom");
        assert_eq!(caption["offset"]["y"], 0.15);
        assert_eq!(caption["transition"]["out"], "fade");

        let music = &tracks[3]["clips"][0];
        assert_eq!(music["asset"]["type"], "audio");
        assert_eq!(music["asset"]["volume"], 0.12);
        assert!(music["asset"]["src"].as_str().unwrap().ends_with("/palmtrees.mp3"));
    }

    #[test]
    fn test_output_settings() {
        let json = serde_json::to_value(build_timeline(&spec(30.0))).unwrap();
        assert_eq!(json["output"]["format"], "mp4");
        assert_eq!(json["output"]["resolution"], "hd");
        assert_eq!(json["output"]["aspectRatio"], "9:16");
        assert_eq!(json["output"]["fps"], 30);
        assert_eq!(json["output"]["size"]["width"], 720);
        assert_eq!(json["output"]["size"]["height"], 1280);
    }

    #[test]
    fn test_caption_is_escaped() {
        let mut s = spec(15.0);
        s.caption = "<script>alert('x')</script> & more".to_string();
        let doc = build_timeline(&s);
        let Asset::Html { html, .. } = &doc.timeline.tracks[2].clips[0].asset else {
            panic!("caption track should hold an html asset");
        };
        assert_eq!(
            html,
            "<p>&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; more</p>"
        );
    }

    #[test]
    fn test_estimate_composite_duration() {
        assert_eq!(estimate_composite_duration(""), 30.0);
        assert_eq!(estimate_composite_duration("   "), 30.0);
        assert_eq!(estimate_composite_duration("one two three"), 15.0);
        assert_eq!(estimate_composite_duration(&"word ".repeat(65)), 26.0);
        assert_eq!(estimate_composite_duration(&"word ".repeat(500)), 60.0);
    }

    #[test]
    fn test_spec_validation() {
        assert!(spec(30.0).validate().is_ok());
        assert!(spec(0.0).validate().is_err());
        let mut s = spec(30.0);
        s.avatar_video_url.clear();
        assert!(s.validate().is_err());
    }
}
