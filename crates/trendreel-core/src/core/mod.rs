//! TrendReel Core Engine
//!
//! Pipeline stages: scrape, analyze, concept generation, provider fan-out,
//! avatar narration and compositing.

pub mod ai;
pub mod generative;
pub mod jobs;
pub mod scrape;
pub mod settings;
pub mod timeline;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;
