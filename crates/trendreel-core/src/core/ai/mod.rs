//! AI Module
//!
//! Language-model stages of the pipeline: trend analysis, prompt variants,
//! concept generation and narration scripts.

pub mod analysis;
pub mod concepts;
pub mod json;
pub mod provider;
pub mod providers;

pub use analysis::{analyze_posts, summarize_posts, EngagementStats};
pub use concepts::{
    build_spoken_script, generate_concept, preview_spoken_script, propose_prompts, PROMPT_ANGLES,
    SPOKEN_SCRIPT_MAX_WORDS,
};
pub use json::{parse_json, strip_fences};
pub use provider::{AIProvider, CompletionRequest, CompletionResponse, FinishReason, TokenUsage};
pub use providers::{create_provider, AnthropicProvider, MockAIProvider};
