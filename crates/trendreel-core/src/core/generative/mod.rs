//! Generative Video Orchestration
//!
//! Uniform submit/poll contract over the text-to-video, avatar and
//! compositing services, plus the fan-out engine driving them.

pub mod engine;
pub mod provider_impls;
pub mod providers;
pub mod registry;
pub mod task;
pub mod video;

// Re-export main types
pub use engine::{
    generate_backgrounds, generate_videos, submit_all, submit_avatar, GenerativeEngine,
    BACKGROUND_SLOTS,
};
pub use providers::{GenerativeProvider, MockGenerativeProvider, MockOutcome, ProviderCapability};
pub use registry::{ProviderId, ProviderRegistry};
pub use task::{GenerationTask, TaskStatus};
pub use video::{AvatarParams, GenerationRequest, VideoGenerationParams};
