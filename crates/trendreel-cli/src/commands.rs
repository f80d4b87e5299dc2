//! Subcommand handlers
//!
//! Thin glue: load inputs, call one library stage, print JSON.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::info;

use trendreel_core::core::ai::{self, create_provider};
use trendreel_core::core::generative::{GenerationTask, GenerativeEngine, ProviderId};
use trendreel_core::core::scrape::{normalize_hashtags, source_for, ContentType};
use trendreel_core::core::settings::PipelineConfig;
use trendreel_core::core::timeline::{estimate_composite_duration, music_tracks, CompositeSpec};
use trendreel_core::core::{AnalysisResult, Concept, Platform, PostRecord};

use crate::AnalysisInput;

// =============================================================================
// I/O Helpers
// =============================================================================

/// Output of `analyze`, read back by the later stages
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AnalysisFile {
    pub platform: Platform,
    pub hashtags: Vec<String>,
    pub total_scraped: usize,
    #[serde(default)]
    pub posts: Vec<PostRecord>,
    pub analysis: AnalysisResult,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", rendered);
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} file {}", what, path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {} file {}", what, path.display()))
}

/// Loads an analysis file and applies the command-line overrides
fn load_analysis(input: &AnalysisInput) -> Result<AnalysisFile> {
    let mut file: AnalysisFile = read_json(&input.analysis, "analysis")?;
    if !input.hashtags.is_empty() {
        file.hashtags = normalize_hashtags(&input.hashtags)?;
    }
    if let Some(platform) = input.platform {
        file.platform = platform;
    }
    Ok(file)
}

// =============================================================================
// Trend Stages
// =============================================================================

pub(crate) async fn analyze(
    config: &PipelineConfig,
    platform: Platform,
    hashtags: &[String],
    content_types: &[ContentType],
) -> Result<()> {
    let hashtags = normalize_hashtags(hashtags)?;
    let source = source_for(config, platform, content_types)?;
    let oracle = create_provider(config)?;

    let posts = source
        .fetch_posts(&hashtags)
        .await
        .with_context(|| format!("{} scrape failed", platform.label()))?;
    if posts.is_empty() {
        bail!(
            "No {} posts found for {}; try other hashtags or looser limits",
            platform.label(),
            hashtags.join(", ")
        );
    }

    let analysis = ai::analyze_posts(oracle.as_ref(), &config.oracle, &posts, &hashtags, platform)
        .await
        .context("Analysis failed")?;

    print_json(&AnalysisFile {
        platform,
        hashtags,
        total_scraped: posts.len(),
        posts,
        analysis,
    })
}

pub(crate) async fn propose(config: &PipelineConfig, input: &AnalysisInput) -> Result<()> {
    let file = load_analysis(input)?;
    let oracle = create_provider(config)?;
    let variants = ai::propose_prompts(
        oracle.as_ref(),
        &config.oracle,
        &file.analysis,
        &file.hashtags,
        file.platform,
    )
    .await
    .context("Prompt proposal failed")?;
    print_json(&variants)
}

pub(crate) async fn concept(config: &PipelineConfig, input: &AnalysisInput, prompt: Option<&str>) -> Result<()> {
    let file = load_analysis(input)?;
    let oracle = create_provider(config)?;
    let concept = ai::generate_concept(
        oracle.as_ref(),
        &config.oracle,
        &file.analysis,
        &file.hashtags,
        prompt,
        file.platform,
    )
    .await
    .context("Concept generation failed")?;
    print_json(&concept)
}

#[derive(Serialize)]
struct ScriptOutput {
    spoken_script: String,
    word_count: usize,
    estimated_duration_secs: f64,
}

pub(crate) async fn script(config: &PipelineConfig, concept: Option<&Path>, analysis: Option<&Path>) -> Result<()> {
    let spoken_script = match (concept, analysis) {
        (Some(path), _) => {
            let concept: Concept = read_json(path, "concept")?;
            ai::build_spoken_script(&concept)
        }
        (None, Some(path)) => {
            let file: AnalysisFile = read_json(path, "analysis")?;
            let oracle = create_provider(config)?;
            ai::preview_spoken_script(
                oracle.as_ref(),
                &config.oracle,
                &file.analysis,
                &file.hashtags,
                file.platform,
            )
            .await
            .context("Script preview failed")?
        }
        (None, None) => bail!("Pass either --concept or --analysis"),
    };

    print_json(&ScriptOutput {
        word_count: spoken_script.split_whitespace().count(),
        estimated_duration_secs: estimate_composite_duration(&spoken_script),
        spoken_script,
    })
}

// =============================================================================
// Generation Stages
// =============================================================================

#[derive(Serialize)]
struct GenerateOutput {
    concept: Concept,
    tasks: Vec<GenerationTask>,
}

pub(crate) async fn generate(config: &PipelineConfig, concept_path: &Path) -> Result<()> {
    let concept: Concept = read_json(concept_path, "concept")?;
    if concept.runway_prompt.trim().is_empty() {
        bail!("Concept {} has no runway_prompt", concept_path.display());
    }

    let engine = GenerativeEngine::from_config(config)?;
    let tasks = engine.generate_videos(&concept).await;
    info!(
        "{} of {} providers accepted the concept",
        tasks.iter().filter(|t| t.task_id.is_some()).count(),
        tasks.len()
    );
    print_json(&GenerateOutput { concept, tasks })
}

pub(crate) async fn backgrounds(
    config: &PipelineConfig,
    prompt_a: &str,
    prompt_b: &str,
    provider: ProviderId,
) -> Result<()> {
    let engine = GenerativeEngine::from_config(config)?;
    let tasks = engine.generate_backgrounds(prompt_a, prompt_b, provider).await?;
    print_json(&tasks)
}

pub(crate) async fn poll(config: &PipelineConfig, provider: ProviderId, task_id: &str) -> Result<()> {
    let engine = GenerativeEngine::from_config(config)?;
    let task = engine.poll_task(provider, task_id).await?;
    print_json(&task)
}

pub(crate) async fn avatars(config: &PipelineConfig) -> Result<()> {
    let engine = GenerativeEngine::from_config(config)?;
    let catalog = engine
        .list_avatars_and_voices()
        .await
        .context("HeyGen catalog lookup failed")?;
    print_json(&catalog)
}

pub(crate) async fn avatar(
    config: &PipelineConfig,
    concept_path: &Path,
    avatar_id: &str,
    voice_id: &str,
    script: Option<&str>,
) -> Result<()> {
    let concept: Concept = read_json(concept_path, "concept")?;
    let engine = GenerativeEngine::from_config(config)?;
    let task = engine.submit_avatar(&concept, avatar_id, voice_id, script).await?;
    print_json(&task)
}

/// Arguments of the `composite` subcommand
pub(crate) struct CompositeArgs {
    pub avatar_url: String,
    pub background_url: String,
    pub caption: String,
    pub music: String,
    pub duration: Option<f64>,
    pub script: Option<String>,
}

pub(crate) async fn composite(config: &PipelineConfig, args: CompositeArgs) -> Result<()> {
    let duration_secs = match (args.duration, args.script.as_deref()) {
        (Some(duration), _) => duration,
        (None, Some(script)) => estimate_composite_duration(script),
        (None, None) => estimate_composite_duration(""),
    };

    let spec = CompositeSpec {
        avatar_video_url: args.avatar_url,
        background_video_url: args.background_url,
        caption: args.caption,
        music_track_id: args.music,
        duration_secs,
    };

    let engine = GenerativeEngine::from_config(config)?;
    let task = engine.submit_composite(&spec).await?;
    print_json(&task)
}

pub(crate) fn music() -> Result<()> {
    print_json(&music_tracks())
}
