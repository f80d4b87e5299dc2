//! AI Provider Implementations
//!
//! Concrete implementations of the AIProvider trait.

mod anthropic;

pub use super::provider::MockAIProvider;
pub use anthropic::AnthropicProvider;

use std::sync::Arc;

use super::provider::AIProvider;
use crate::core::settings::PipelineConfig;
use crate::core::CoreResult;

/// Creates the configured oracle
pub fn create_provider(config: &PipelineConfig) -> CoreResult<Arc<dyn AIProvider>> {
    Ok(Arc::new(AnthropicProvider::from_config(config)?))
}
