//! TrendReel Core Library
//!
//! Turns trending social posts into short-form vertical video.
//! This library holds the scraping adapters, the language-model stages,
//! the multi-provider video orchestration layer and the compositing stage.
//!
//! Transport (the `trendreel` CLI) lives in a separate crate and only calls
//! into the public functions re-exported here.

pub mod core;

pub use crate::core::{CoreError, CoreResult};
