//! Provider Implementations
//!
//! Concrete implementations of the GenerativeProvider trait.

pub mod fal;
pub mod heygen;
pub(crate) mod http;
pub mod luma;
pub mod runway;
pub mod shotstack;

pub use fal::{FalModel, FalProvider};
pub use heygen::{AvatarInfo, HeyGenCatalog, HeyGenProvider, VoiceInfo};
pub use http::flatten_error;
pub use luma::LumaProvider;
pub use runway::{RunwayModel, RunwayProvider};
pub use shotstack::ShotstackProvider;
