//! Generative Engine
//!
//! Fan-out of one concept to every video provider, background-slot and
//! avatar submissions, compositing, and single-shot polling by provider id.
//! Submissions run as independent tokio tasks; results come back in input
//! order without waiting for any remote job to finish.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

use super::provider_impls::HeyGenCatalog;
use super::providers::GenerativeProvider;
use super::registry::{ProviderId, ProviderRegistry};
use super::task::GenerationTask;
use super::video::{AvatarParams, GenerationRequest, VideoGenerationParams};
use crate::core::ai::concepts::build_spoken_script;
use crate::core::settings::PipelineConfig;
use crate::core::timeline::CompositeSpec;
use crate::core::types::Concept;
use crate::core::{CoreError, CoreResult};

/// Slot labels for the two background submissions
pub const BACKGROUND_SLOTS: [&str; 2] = ["A", "B"];

// =============================================================================
// Fan-Out
// =============================================================================

/// Submits every `(provider, request)` pair concurrently and collects the
/// tasks in input order. A panicked submission becomes an `error` entry.
pub async fn submit_all(
    jobs: Vec<(Arc<dyn GenerativeProvider>, GenerationRequest)>,
) -> Vec<GenerationTask> {
    let labels: Vec<(String, String)> = jobs
        .iter()
        .map(|(p, _)| (p.name().to_string(), p.model().to_string()))
        .collect();

    let handles: Vec<_> = jobs
        .into_iter()
        .map(|(provider, request)| tokio::spawn(async move { provider.submit(&request).await }))
        .collect();

    join_all(handles)
        .await
        .into_iter()
        .zip(labels)
        .map(|(joined, (platform, model))| match joined {
            Ok(task) => task,
            Err(e) => {
                warn!("{} {} submission task did not complete: {}", platform, model, e);
                GenerationTask::error(platform, model, format!("Submission task failed: {}", e))
            }
        })
        .collect()
}

/// Submits the concept's visual prompt to every provider. One entry per
/// provider, in the given order; unconfigured providers yield `error` entries.
pub async fn generate_videos(
    concept: &Concept,
    providers: &[Arc<dyn GenerativeProvider>],
) -> Vec<GenerationTask> {
    let params = VideoGenerationParams::new(&concept.runway_prompt);
    let jobs = providers
        .iter()
        .map(|p| (Arc::clone(p), GenerationRequest::Video(params.clone())))
        .collect();

    let tasks = submit_all(jobs).await;
    let accepted = tasks.iter().filter(|t| t.task_id.is_some()).count();
    info!(
        "Fanned out concept '{}' to {} providers ({} accepted)",
        concept.title,
        tasks.len(),
        accepted
    );
    tasks
}

/// Submits two background prompts to one provider, tagged as slots A and B
pub async fn generate_backgrounds(
    prompt_a: &str,
    prompt_b: &str,
    provider: Arc<dyn GenerativeProvider>,
) -> Vec<GenerationTask> {
    let jobs = [prompt_a, prompt_b]
        .iter()
        .map(|prompt| {
            (
                Arc::clone(&provider),
                GenerationRequest::Video(VideoGenerationParams::new(*prompt)),
            )
        })
        .collect();

    submit_all(jobs)
        .await
        .into_iter()
        .zip(BACKGROUND_SLOTS)
        .map(|(task, slot)| task.with_slot(slot))
        .collect()
}

/// Submits an avatar narration. A non-blank `spoken_script` overrides the
/// script derived from the concept.
pub async fn submit_avatar(
    provider: &dyn GenerativeProvider,
    concept: &Concept,
    avatar_id: &str,
    voice_id: &str,
    spoken_script: Option<&str>,
) -> GenerationTask {
    let script = match spoken_script.map(str::trim).filter(|s| !s.is_empty()) {
        Some(custom) => custom.to_string(),
        None => build_spoken_script(concept),
    };
    provider
        .submit(&GenerationRequest::Avatar(AvatarParams::new(
            avatar_id, voice_id, script,
        )))
        .await
}

// =============================================================================
// Generative Engine
// =============================================================================

/// Registry-backed entry point used by the CLI
#[derive(Debug)]
pub struct GenerativeEngine {
    registry: ProviderRegistry,
}

impl GenerativeEngine {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    pub fn from_config(config: &PipelineConfig) -> CoreResult<Self> {
        Ok(Self::new(ProviderRegistry::from_config(config)?))
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub async fn generate_videos(&self, concept: &Concept) -> Vec<GenerationTask> {
        generate_videos(concept, &self.registry.video_providers()).await
    }

    pub async fn generate_backgrounds(
        &self,
        prompt_a: &str,
        prompt_b: &str,
        provider: ProviderId,
    ) -> CoreResult<Vec<GenerationTask>> {
        if !provider.is_video() {
            return Err(CoreError::ValidationError(format!(
                "{} is not a video provider",
                provider
            )));
        }
        let provider = self.registry.get(provider)?;
        Ok(generate_backgrounds(prompt_a, prompt_b, provider).await)
    }

    pub async fn submit_avatar(
        &self,
        concept: &Concept,
        avatar_id: &str,
        voice_id: &str,
        spoken_script: Option<&str>,
    ) -> CoreResult<GenerationTask> {
        let heygen = self.registry.get(ProviderId::HeyGen)?;
        Ok(submit_avatar(heygen.as_ref(), concept, avatar_id, voice_id, spoken_script).await)
    }

    pub async fn submit_composite(&self, spec: &CompositeSpec) -> CoreResult<GenerationTask> {
        let shotstack = self.registry.get(ProviderId::Shotstack)?;
        Ok(shotstack
            .submit(&GenerationRequest::Composite(spec.clone()))
            .await)
    }

    /// Single-shot poll by provider id
    pub async fn poll_task(&self, provider: ProviderId, task_id: &str) -> CoreResult<GenerationTask> {
        if task_id.trim().is_empty() {
            return Err(CoreError::ValidationError("Task id cannot be empty".to_string()));
        }
        let provider = self.registry.get(provider)?;
        Ok(provider.poll(task_id).await)
    }

    pub async fn list_avatars_and_voices(&self) -> CoreResult<HeyGenCatalog> {
        self.registry.heygen()?.list_avatars_and_voices().await
    }
}

// =============================================================================
// Tests
// =============================================================================
