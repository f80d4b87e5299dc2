//! TrendReel CLI
//!
//! Headless driver for the trend-to-video pipeline. Every subcommand prints
//! a single JSON document on stdout; logs go to stderr.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trendreel_core::core::generative::ProviderId;
use trendreel_core::core::scrape::ContentType;
use trendreel_core::core::settings::PipelineConfig;
use trendreel_core::core::Platform;

/// TrendReel - trending posts in, short-form video out
#[derive(Parser)]
#[command(name = "trendreel")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Scrape trends, generate concepts and fan them out to AI video providers")]
#[command(long_about = r#"
TrendReel turns trending Instagram or TikTok posts into vertical video.

Typical flow:
  trendreel analyze --hashtags desksetup > analysis.json
  trendreel propose --analysis analysis.json
  trendreel concept --analysis analysis.json --prompt "..." > concept.json
  trendreel generate --concept concept.json
  trendreel poll kling <task_id>
  trendreel composite --avatar-url ... --background-url ... --caption "..."

Credentials are read from ANTHROPIC_API_KEY, APIFY_TOKEN, RUNWAYML_API_KEY,
FAL_KEY, LUMAAI_API_KEY, HEYGEN_API_KEY and SHOTSTACK_API_KEY.
"#)]
struct Cli {
    /// JSON config file; environment variables override its values
    #[arg(short, long, global = true, env = "TRENDREEL_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where a stage reads its analysis from
#[derive(Args, Debug)]
struct AnalysisInput {
    /// Output file of `trendreel analyze`
    #[arg(short, long)]
    analysis: PathBuf,

    /// Override the hashtags recorded in the analysis file
    #[arg(long, value_delimiter = ',')]
    hashtags: Vec<String>,

    /// Override the platform recorded in the analysis file
    #[arg(long)]
    platform: Option<Platform>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape posts for hashtags and analyze the trends
    Analyze {
        /// Hashtags to scrape, comma separated (leading # is optional)
        #[arg(long, value_delimiter = ',', required = true)]
        hashtags: Vec<String>,

        #[arg(short, long, default_value = "instagram")]
        platform: Platform,

        /// Instagram only: drop posts below this like count
        #[arg(long)]
        min_likes: Option<u64>,

        /// Instagram only: results per content type
        #[arg(long)]
        max_posts: Option<u32>,

        /// Instagram only: posts, reels (default both)
        #[arg(long, value_delimiter = ',')]
        content_types: Vec<ContentType>,

        /// TikTok only: results per hashtag
        #[arg(long)]
        results_per_page: Option<u32>,
    },

    /// Propose seven visual prompt variants for an analysis
    Propose {
        #[command(flatten)]
        input: AnalysisInput,
    },

    /// Generate one concept from an analysis
    Concept {
        #[command(flatten)]
        input: AnalysisInput,

        /// Use this visual prompt verbatim
        #[arg(long)]
        prompt: Option<String>,
    },

    /// Print the avatar narration script
    Script {
        /// Derive the script from an existing concept file
        #[arg(long, conflicts_with = "analysis")]
        concept: Option<PathBuf>,

        /// Generate a fresh concept from this analysis file first
        #[arg(long)]
        analysis: Option<PathBuf>,
    },

    /// Submit a concept to every video provider
    Generate {
        /// Concept file produced by `trendreel concept`
        #[arg(long)]
        concept: PathBuf,
    },

    /// Submit two background prompts to one provider (slots A and B)
    Backgrounds {
        #[arg(long)]
        prompt_a: String,

        #[arg(long)]
        prompt_b: String,

        #[arg(long, default_value = "kling")]
        provider: ProviderId,
    },

    /// Check a submitted task once
    Poll {
        /// Provider id (runway-veo, runway-gen4, kling, pika, hailuo, luma, heygen, shotstack)
        provider: ProviderId,

        task_id: String,
    },

    /// List HeyGen avatars and English voices
    Avatars,

    /// Submit an avatar narration for a concept
    Avatar {
        #[arg(long)]
        concept: PathBuf,

        #[arg(long)]
        avatar_id: String,

        #[arg(long)]
        voice_id: String,

        /// Custom narration; defaults to the concept's derived script
        #[arg(long)]
        script: Option<String>,
    },

    /// Render avatar, background, caption and music into one video
    Composite {
        #[arg(long)]
        avatar_url: String,

        #[arg(long)]
        background_url: String,

        /// Opening caption (usually the hook)
        #[arg(long, default_value = "")]
        caption: String,

        #[arg(long, default_value = "hype")]
        music: String,

        /// Total length in seconds
        #[arg(long, conflicts_with = "script")]
        duration: Option<f64>,

        /// Estimate the length from this narration instead
        #[arg(long)]
        script: Option<String>,
    },

    /// List the background music catalog
    Music,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("trendreel={level},trendreel_core={level},warn").into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            let mut config = PipelineConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?;
            config.apply_overrides(|key| std::env::var(key).ok());
            Ok(config)
        }
        None => Ok(PipelineConfig::from_env()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_ref())?;
    tracing::debug!("Pipeline config: {:?}", config);

    match cli.command {
        Commands::Analyze {
            hashtags,
            platform,
            min_likes,
            max_posts,
            content_types,
            results_per_page,
        } => {
            let mut config = config;
            if let Some(min_likes) = min_likes {
                config.scrape.min_likes = min_likes;
            }
            if let Some(max_posts) = max_posts {
                config.scrape.max_posts = max_posts;
            }
            if let Some(results_per_page) = results_per_page {
                config.scrape.results_per_page = results_per_page;
            }
            config.normalize();
            commands::analyze(&config, platform, &hashtags, &content_types).await
        }
        Commands::Propose { input } => commands::propose(&config, &input).await,
        Commands::Concept { input, prompt } => {
            commands::concept(&config, &input, prompt.as_deref()).await
        }
        Commands::Script { concept, analysis } => {
            commands::script(&config, concept.as_deref(), analysis.as_deref()).await
        }
        Commands::Generate { concept } => commands::generate(&config, &concept).await,
        Commands::Backgrounds {
            prompt_a,
            prompt_b,
            provider,
        } => commands::backgrounds(&config, &prompt_a, &prompt_b, provider).await,
        Commands::Poll { provider, task_id } => commands::poll(&config, provider, &task_id).await,
        Commands::Avatars => commands::avatars(&config).await,
        Commands::Avatar {
            concept,
            avatar_id,
            voice_id,
            script,
        } => commands::avatar(&config, &concept, &avatar_id, &voice_id, script.as_deref()).await,
        Commands::Composite {
            avatar_url,
            background_url,
            caption,
            music,
            duration,
            script,
        } => {
            commands::composite(
                &config,
                commands::CompositeArgs {
                    avatar_url,
                    background_url,
                    caption,
                    music,
                    duration,
                    script,
                },
            )
            .await
        }
        Commands::Music => commands::music(),
    }
}

// =============================================================================
// Tests
// =============================================================================
