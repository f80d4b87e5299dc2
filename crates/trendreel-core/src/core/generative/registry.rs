//! Provider Registry
//!
//! Builds every adapter from a [`PipelineConfig`] and hands them out by id.
//! Providers without a credential are still registered so that fan-out
//! reports them as `error` entries instead of silently skipping them.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::provider_impls::{
    FalModel, FalProvider, HeyGenProvider, LumaProvider, RunwayModel, RunwayProvider,
    ShotstackProvider,
};
use super::providers::GenerativeProvider;
use crate::core::settings::{CredentialKind, PipelineConfig};
use crate::core::{CoreError, CoreResult};

// =============================================================================
// Provider Id
// =============================================================================

/// Stable identifiers for every adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderId {
    RunwayVeo,
    RunwayGen4,
    Kling,
    Pika,
    Hailuo,
    Luma,
    HeyGen,
    Shotstack,
}

impl ProviderId {
    /// Video providers in fan-out order
    pub const VIDEO: [ProviderId; 6] = [
        ProviderId::RunwayVeo,
        ProviderId::RunwayGen4,
        ProviderId::Kling,
        ProviderId::Pika,
        ProviderId::Hailuo,
        ProviderId::Luma,
    ];

    pub const ALL: [ProviderId; 8] = [
        ProviderId::RunwayVeo,
        ProviderId::RunwayGen4,
        ProviderId::Kling,
        ProviderId::Pika,
        ProviderId::Hailuo,
        ProviderId::Luma,
        ProviderId::HeyGen,
        ProviderId::Shotstack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::RunwayVeo => "runway-veo",
            ProviderId::RunwayGen4 => "runway-gen4",
            ProviderId::Kling => "kling",
            ProviderId::Pika => "pika",
            ProviderId::Hailuo => "hailuo",
            ProviderId::Luma => "luma",
            ProviderId::HeyGen => "heygen",
            ProviderId::Shotstack => "shotstack",
        }
    }

    pub fn is_video(&self) -> bool {
        Self::VIDEO.contains(self)
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProviderId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "runway-veo" | "runway" | "veo" => Ok(ProviderId::RunwayVeo),
            "runway-gen4" | "gen4" => Ok(ProviderId::RunwayGen4),
            "kling" => Ok(ProviderId::Kling),
            "pika" => Ok(ProviderId::Pika),
            "hailuo" => Ok(ProviderId::Hailuo),
            "luma" => Ok(ProviderId::Luma),
            "heygen" => Ok(ProviderId::HeyGen),
            "shotstack" => Ok(ProviderId::Shotstack),
            _ => Err(CoreError::NotFound(format!("Unknown provider: {}", s))),
        }
    }
}

// =============================================================================
// Provider Registry
// =============================================================================

/// All configured providers, in registration order
pub struct ProviderRegistry {
    providers: Vec<(ProviderId, Arc<dyn GenerativeProvider>)>,
    heygen: Option<Arc<HeyGenProvider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.ids())
            .finish_non_exhaustive()
    }
}

impl ProviderRegistry {
    /// Empty registry, for assembling test doubles
    pub fn empty() -> Self {
        Self {
            providers: Vec::new(),
            heygen: None,
        }
    }

    /// Builds every adapter from the config
    pub fn from_config(config: &PipelineConfig) -> CoreResult<Self> {
        let timeout = config.http_timeout();
        let creds = &config.credentials;
        let endpoints = &config.endpoints;

        let runway_key = creds.get_or_empty(CredentialKind::Runway);
        let fal_key = creds.get_or_empty(CredentialKind::Fal);

        let heygen = Arc::new(
            HeyGenProvider::new(creds.get_or_empty(CredentialKind::HeyGen), timeout)?
                .with_base_url(&endpoints.heygen),
        );

        let mut registry = Self::empty();
        registry.insert(
            ProviderId::RunwayVeo,
            Arc::new(
                RunwayProvider::new(runway_key.clone(), RunwayModel::Veo31, timeout)?
                    .with_base_url(&endpoints.runway),
            ),
        );
        registry.insert(
            ProviderId::RunwayGen4,
            Arc::new(
                RunwayProvider::new(runway_key, RunwayModel::Gen45, timeout)?
                    .with_base_url(&endpoints.runway),
            ),
        );
        for (id, model) in [
            (ProviderId::Kling, FalModel::Kling),
            (ProviderId::Pika, FalModel::Pika),
            (ProviderId::Hailuo, FalModel::Hailuo),
        ] {
            registry.insert(
                id,
                Arc::new(
                    FalProvider::new(fal_key.clone(), model, timeout)?
                        .with_base_url(&endpoints.fal_queue),
                ),
            );
        }
        registry.insert(
            ProviderId::Luma,
            Arc::new(
                LumaProvider::new(creds.get_or_empty(CredentialKind::Luma), timeout)?
                    .with_base_url(&endpoints.luma),
            ),
        );
        registry.insert(ProviderId::HeyGen, heygen.clone());
        registry.heygen = Some(heygen);
        registry.insert(
            ProviderId::Shotstack,
            Arc::new(
                ShotstackProvider::new(creds.get_or_empty(CredentialKind::Shotstack), timeout)?
                    .with_base_url(&endpoints.shotstack),
            ),
        );

        let available: Vec<&str> = registry
            .providers
            .iter()
            .filter(|(_, p)| p.is_available())
            .map(|(id, _)| id.as_str())
            .collect();
        info!("Provider registry built; configured: [{}]", available.join(", "));

        Ok(registry)
    }

    /// Adds or replaces a provider, keeping its original position on replace
    pub fn insert(&mut self, id: ProviderId, provider: Arc<dyn GenerativeProvider>) {
        match self.providers.iter_mut().find(|(existing, _)| *existing == id) {
            Some(slot) => slot.1 = provider,
            None => self.providers.push((id, provider)),
        }
    }

    pub fn ids(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|(id, _)| *id).collect()
    }

    /// Looks up a provider by id
    pub fn get(&self, id: ProviderId) -> CoreResult<Arc<dyn GenerativeProvider>> {
        self.providers
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, p)| Arc::clone(p))
            .ok_or_else(|| CoreError::NotFound(format!("Provider {} is not registered", id)))
    }

    /// Video providers in fan-out order
    pub fn video_providers(&self) -> Vec<Arc<dyn GenerativeProvider>> {
        self.providers
            .iter()
            .filter(|(id, _)| id.is_video())
            .map(|(_, p)| Arc::clone(p))
            .collect()
    }

    /// Concrete HeyGen adapter, for the avatar catalog lookup
    pub fn heygen(&self) -> CoreResult<Arc<HeyGenProvider>> {
        self.heygen
            .clone()
            .ok_or_else(|| CoreError::NotFound("HeyGen provider is not registered".to_string()))
    }
}

// =============================================================================
// Tests
// =============================================================================
