//! Concept Generation Stage
//!
//! Turns a trend analysis into visual prompt variants and a single
//! production-ready concept, and derives the narration script spoken by
//! the avatar.

use serde::Deserialize;
use tracing::{info, warn};

use super::json::parse_json;
use super::provider::{AIProvider, CompletionRequest};
use crate::core::settings::OracleSettings;
use crate::core::{AnalysisResult, Concept, CoreError, CoreResult, Platform, PromptVariant};

/// Words kept in an avatar narration (about 30 seconds of speech)
pub const SPOKEN_SCRIPT_MAX_WORDS: usize = 65;

/// Soft upper bound on visual prompt length
pub const PROMPT_WORD_TARGET: usize = 80;

/// Creative angles for prompt variants, in the order they are requested
pub const PROMPT_ANGLES: [(&str, &str); 7] = [
    (
        "Cinematic & Moody",
        "deep shadows, slow push-in, desaturated grade, a sense of tension",
    ),
    (
        "Energetic & Raw",
        "handheld follow, motion blur that implies quick cuts, kinetic energy",
    ),
    (
        "Minimal & Clean",
        "white or neutral backdrop, one hero object, unhurried pacing",
    ),
    (
        "Macro & Texture",
        "extreme close-ups of surfaces and materials, shallow depth of field",
    ),
    (
        "Aerial Drift",
        "slow overhead or high-angle glide over landscapes, crowds or architecture",
    ),
    (
        "Golden Hour / Backlit",
        "warm backlight at magic hour, lens flare, long shadows, rim light",
    ),
    (
        "Product / Object Story",
        "a single object under studio light, slow rotation or reveal",
    ),
];

const VISUAL_RULES: &str = "\
- Visuals only: no dialogue, no on-screen text
- Name the camera movement (slow push-in, aerial drift, handheld follow, macro pull-focus ...)
- Name the lighting (golden hour, soft diffused, neon glow, rim light, studio key ...)
- Give mood, texture and material detail
- No human faces: use hands, silhouettes, landscapes and objects instead
- Stay under 80 words";

// =============================================================================
// Prompt Building
// =============================================================================

const PROMPT_WRITER_ROLE: &str = "You write prompts for text-to-video models.";

const DIRECTOR_ROLE: &str =
    "You direct short-form social video and write prompts for text-to-video models.";

fn analysis_context(analysis: &AnalysisResult, hashtags: &[String], platform: Platform) -> String {
    let proposal = &analysis.video_proposal;
    let visual_style = serde_json::to_string_pretty(&proposal.visual_style).unwrap_or_default();
    format!(
        "{} trend analysis for: {}\n\nKEY INSIGHTS:\n{}\n\nTOP PATTERNS:\n{}\n\n\
         PROPOSED VIDEO:\nTitle: {}\nHook: {}\nVisual Style: {}",
        platform.label(),
        hashtags.join(", "),
        analysis.key_insights,
        analysis.patterns_text(),
        proposal.title,
        proposal.hook,
        visual_style
    )
}

fn proposals_prompt(analysis: &AnalysisResult, hashtags: &[String], platform: Platform) -> String {
    let angles = PROMPT_ANGLES
        .iter()
        .enumerate()
        .map(|(i, (label, hint))| format!("{}. {}: {}", i + 1, label, hint))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"{context}

Write exactly {count} text-to-video prompt variations for this trend, one per creative angle below, in this order:

{angles}

Answer with a JSON array of exactly {count} objects:
[
  {{
    "label": "2-4 word label naming the angle (e.g. 'Macro & Texture')",
    "description": "one sentence on what sets this prompt apart and why it suits the trend",
    "prompt": "a vivid 50-80 word video prompt covering motion, lighting, camera movement and mood"
  }}
]

Rules for every prompt:
{rules}
- Make the variations clearly different from one another
- Tie each one to the trend topic

Output the JSON array only, without markdown or commentary."#,
        context = analysis_context(analysis, hashtags, platform),
        count = PROMPT_ANGLES.len(),
        angles = angles,
        rules = VISUAL_RULES,
    )
}

fn concept_prompt(
    analysis: &AnalysisResult,
    hashtags: &[String],
    selected_prompt: Option<&str>,
    platform: Platform,
) -> String {
    let prompt_instruction = match selected_prompt {
        Some(selected) => format!(
            "Set \"runway_prompt\" to EXACTLY this text, unchanged:\n\"{}\"",
            selected
        ),
        None => format!(
            "Write \"runway_prompt\" as a vivid 50-80 word video prompt covering motion, \
             lighting, camera movement and mood.\n\nRules for runway_prompt:\n{}",
            VISUAL_RULES
        ),
    };

    format!(
        r#"{context}

Create one reel concept built on these trends. Answer with a JSON array holding exactly 1 object:
[
  {{
    "concept_number": 1,
    "title": "short, punchy title",
    "angle": "the emotional angle (educational, comedic, aspirational ...)",
    "hook": "the opening line or image for the first 3 seconds",
    "script_outline": [
      {{"timestamp": "0-3s", "action": "what is on screen"}},
      {{"timestamp": "3-10s", "action": "what is on screen"}},
      {{"timestamp": "10-20s", "action": "what is on screen"}},
      {{"timestamp": "20-30s", "action": "call to action and close"}}
    ],
    "runway_prompt": "see the instruction below",
    "hashtags": ["tag1", "tag2", "tag3", "tag4", "tag5"]
  }}
]

{instruction}

Output the JSON array only, without markdown or commentary."#,
        context = analysis_context(analysis, hashtags, platform),
        instruction = prompt_instruction,
    )
}

// =============================================================================
// Stage Operations
// =============================================================================

/// Asks the oracle for one prompt variant per creative angle
pub async fn propose_prompts(
    oracle: &dyn AIProvider,
    settings: &OracleSettings,
    analysis: &AnalysisResult,
    hashtags: &[String],
    platform: Platform,
) -> CoreResult<Vec<PromptVariant>> {
    let request = CompletionRequest::new(proposals_prompt(analysis, hashtags, platform))
        .with_system(PROMPT_WRITER_ROLE)
        .with_model(&settings.model)
        .with_max_tokens(settings.proposals_max_tokens);
    let response = oracle.complete(request).await?;

    let variants: Vec<PromptVariant> = parse_json(&response.text, "prompt variants")?;
    if variants.len() != PROMPT_ANGLES.len() {
        return Err(CoreError::AnalysisParseError(format!(
            "expected {} prompt variants, got {}",
            PROMPT_ANGLES.len(),
            variants.len()
        )));
    }

    info!("Proposed {} prompt variants", variants.len());
    Ok(variants)
}

/// Concept output is an array with one object; a bare object is accepted too
#[derive(Deserialize)]
#[serde(untagged)]
enum ConceptPayload {
    Many(Vec<Concept>),
    One(Box<Concept>),
}

/// Asks the oracle for one concept. A supplied `selected_prompt` becomes the
/// concept's visual prompt verbatim.
pub async fn generate_concept(
    oracle: &dyn AIProvider,
    settings: &OracleSettings,
    analysis: &AnalysisResult,
    hashtags: &[String],
    selected_prompt: Option<&str>,
    platform: Platform,
) -> CoreResult<Concept> {
    let selected_prompt = selected_prompt.filter(|p| !p.trim().is_empty());

    let request = CompletionRequest::new(concept_prompt(analysis, hashtags, selected_prompt, platform))
        .with_system(DIRECTOR_ROLE)
        .with_model(&settings.model)
        .with_max_tokens(settings.concept_max_tokens);
    let response = oracle.complete(request).await?;

    let mut concept = match parse_json::<ConceptPayload>(&response.text, "concept")? {
        ConceptPayload::Many(concepts) => concepts.into_iter().next().ok_or_else(|| {
            CoreError::AnalysisParseError("concept: model returned an empty array".to_string())
        })?,
        ConceptPayload::One(concept) => *concept,
    };

    if concept.hook.trim().is_empty() {
        return Err(CoreError::AnalysisParseError("concept: missing hook".to_string()));
    }
    if concept.script_outline.is_empty() {
        return Err(CoreError::AnalysisParseError(
            "concept: missing script outline".to_string(),
        ));
    }

    match selected_prompt {
        Some(selected) => concept.runway_prompt = selected.to_string(),
        None if concept.runway_prompt.trim().is_empty() => {
            return Err(CoreError::AnalysisParseError(
                "concept: missing runway_prompt".to_string(),
            ));
        }
        None => {}
    }

    let words = concept.prompt_word_count();
    if words > PROMPT_WORD_TARGET {
        warn!("Concept prompt runs {} words, over the {}-word target", words, PROMPT_WORD_TARGET);
    }
    info!("Generated concept '{}' ({} outline steps)", concept.title, concept.script_outline.len());
    Ok(concept)
}

/// Narration for the avatar: the hook followed by every non-empty outline
/// action, cut to the first [`SPOKEN_SCRIPT_MAX_WORDS`] words
pub fn build_spoken_script(concept: &Concept) -> String {
    std::iter::once(concept.hook.as_str())
        .chain(
            concept
                .script_outline
                .iter()
                .map(|step| step.action.as_str())
                .filter(|action| !action.trim().is_empty()),
        )
        .flat_map(str::split_whitespace)
        .take(SPOKEN_SCRIPT_MAX_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Generates a fresh concept and returns the script its avatar would speak
pub async fn preview_spoken_script(
    oracle: &dyn AIProvider,
    settings: &OracleSettings,
    analysis: &AnalysisResult,
    hashtags: &[String],
    platform: Platform,
) -> CoreResult<String> {
    let concept = generate_concept(oracle, settings, analysis, hashtags, None, platform).await?;
    Ok(build_spoken_script(&concept))
}

// =============================================================================
// Tests
// =============================================================================
