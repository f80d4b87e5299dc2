//! Apify actor-run client
//!
//! Starts actor runs, maps run status onto [`JobState`] and downloads the
//! default dataset of a finished run.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::generative::provider_impls::http::{build_client, send_json};
use crate::core::jobs::{JobState, PollableJob};
use crate::core::settings::{CredentialKind, PipelineConfig};
use crate::core::{CoreError, CoreResult};

const PROVIDER: &str = "Apify";

// =============================================================================
// API Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActorRunInfo {
    id: Option<String>,
    status: Option<String>,
    default_dataset_id: Option<String>,
}

/// Maps an actor-run status onto the poller's job state
fn map_run_status(status: &str, dataset_id: Option<String>) -> CoreResult<JobState> {
    match status {
        "READY" | "RUNNING" => Ok(JobState::Running),
        "SUCCEEDED" => dataset_id
            .filter(|id| !id.is_empty())
            .map(JobState::Succeeded)
            .ok_or_else(|| {
                CoreError::UnexpectedResponse("Apify run succeeded without a dataset id".to_string())
            }),
        "FAILED" | "ABORTED" | "TIMED-OUT" | "TIMING-OUT" | "ABORTING" => {
            Ok(JobState::Terminal(status.to_string()))
        }
        other => {
            warn!("Unknown Apify run status: {}", other);
            Ok(JobState::Running)
        }
    }
}

// =============================================================================
// ApifyClient
// =============================================================================

/// Client for the actor-run API
pub struct ApifyClient {
    client: reqwest::Client,
    dataset_client: reqwest::Client,
    token: String,
    base_url: String,
    poll_interval: Duration,
    max_wait: Duration,
}

impl std::fmt::Debug for ApifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApifyClient")
            .field("base_url", &self.base_url)
            .field("poll_interval", &self.poll_interval)
            .field("max_wait", &self.max_wait)
            .finish_non_exhaustive()
    }
}

impl ApifyClient {
    /// Creates a client. An empty token is a configuration error.
    pub fn new(
        token: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
        dataset_timeout: Duration,
    ) -> CoreResult<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(CoreError::ConfigurationMissing(
                CredentialKind::Apify.env_var().to_string(),
            ));
        }
        Ok(Self {
            client: build_client(timeout)?,
            dataset_client: build_client(dataset_timeout)?,
            token,
            base_url: base_url.into(),
            poll_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(300),
        })
    }

    pub fn from_config(config: &PipelineConfig) -> CoreResult<Self> {
        let token = config.credentials.require(CredentialKind::Apify)?;
        let scrape = &config.scrape;
        Ok(Self::new(
            token,
            &config.endpoints.apify,
            config.http_timeout(),
            Duration::from_secs(scrape.dataset_timeout_secs),
        )?
        .with_polling(
            Duration::from_secs(scrape.poll_interval_secs),
            Duration::from_secs(scrape.max_wait_secs),
        ))
    }

    pub fn with_polling(mut self, poll_interval: Duration, max_wait: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.max_wait = max_wait;
        self
    }

    /// Actor ids accept `user/name`; the API path form is `user~name`
    fn runs_url(&self, actor: &str) -> String {
        format!("{}/acts/{}/runs", self.base_url, actor.replace('/', "~"))
    }

    fn run_url(&self, run_id: &str) -> String {
        format!("{}/actor-runs/{}", self.base_url, run_id)
    }

    fn dataset_url(&self, dataset_id: &str) -> String {
        format!("{}/datasets/{}/items", self.base_url, dataset_id)
    }

    /// Starts an actor run and returns its id
    pub async fn start_run(&self, actor: &str, input: &Value) -> CoreResult<String> {
        let envelope: Envelope<ActorRunInfo> = send_json(
            PROVIDER,
            self.client
                .post(self.runs_url(actor))
                .query(&[("token", self.token.as_str())])
                .json(input),
        )
        .await?;

        let run_id = envelope
            .data
            .and_then(|d| d.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CoreError::UnexpectedResponse("Apify run response missing id".to_string()))?;

        info!("Apify actor {} run started: {}", actor, run_id);
        Ok(run_id)
    }

    /// Checks an actor run once
    pub async fn run_status(&self, run_id: &str) -> CoreResult<JobState> {
        let envelope: Envelope<ActorRunInfo> = send_json(
            PROVIDER,
            self.client
                .get(self.run_url(run_id))
                .query(&[("token", self.token.as_str())]),
        )
        .await?;

        let run = envelope.data.ok_or_else(|| {
            CoreError::UnexpectedResponse("Apify run status missing data".to_string())
        })?;
        let status = run.status.unwrap_or_default();
        debug!("Apify run {} status: {}", run_id, status);
        map_run_status(&status, run.default_dataset_id)
    }

    /// Downloads every item of a dataset
    pub async fn fetch_dataset<T: DeserializeOwned>(&self, dataset_id: &str) -> CoreResult<Vec<T>> {
        let items: Vec<T> = send_json(
            PROVIDER,
            self.dataset_client.get(self.dataset_url(dataset_id)).query(&[
                ("token", self.token.as_str()),
                ("format", "json"),
                ("clean", "true"),
            ]),
        )
        .await?;
        info!("Fetched {} items from Apify dataset {}", items.len(), dataset_id);
        Ok(items)
    }

    /// Starts an actor run and waits for its dataset
    pub async fn run_actor<T>(&self, actor: &str, input: Value) -> CoreResult<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        let job = ActorRun::<T>::new(self, actor, input);
        crate::core::jobs::run_to_completion(&job, self.poll_interval, self.max_wait).await
    }
}

// =============================================================================
// Actor Run Job
// =============================================================================

/// One actor run, driven by the job poller
pub struct ActorRun<'a, T> {
    client: &'a ApifyClient,
    actor: &'a str,
    input: Value,
    _items: PhantomData<fn() -> T>,
}

impl<'a, T> ActorRun<'a, T> {
    pub fn new(client: &'a ApifyClient, actor: &'a str, input: Value) -> Self {
        Self {
            client,
            actor,
            input,
            _items: PhantomData,
        }
    }
}

#[async_trait]
impl<T> PollableJob for ActorRun<'_, T>
where
    T: DeserializeOwned + Send,
{
    type Output = Vec<T>;

    fn label(&self) -> &str {
        self.actor
    }

    async fn start(&self) -> CoreResult<String> {
        self.client.start_run(self.actor, &self.input).await
    }

    async fn status(&self, job_id: &str) -> CoreResult<JobState> {
        self.client.run_status(job_id).await
    }

    async fn fetch(&self, result_ref: &str) -> CoreResult<Vec<T>> {
        self.client.fetch_dataset(result_ref).await
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base: &str) -> ApifyClient {
        ApifyClient::new("tok", base, Duration::from_secs(2), Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_run_status_vocabulary() {
        assert_eq!(map_run_status("READY", None).unwrap(), JobState::Running);
        assert_eq!(map_run_status("RUNNING", None).unwrap(), JobState::Running);
        assert_eq!(
            map_run_status("SUCCEEDED", Some("ds1".to_string())).unwrap(),
            JobState::Succeeded("ds1".to_string())
        );
        assert!(matches!(
            map_run_status("SUCCEEDED", None),
            Err(CoreError::UnexpectedResponse(_))
        ));
        for failed in ["FAILED", "ABORTED", "TIMED-OUT", "TIMING-OUT", "ABORTING"] {
            assert_eq!(
                map_run_status(failed, None).unwrap(),
                JobState::Terminal(failed.to_string())
            );
        }
        assert_eq!(map_run_status("SOMETHING-NEW", None).unwrap(), JobState::Running);
    }

    #[test]
    fn test_run_info_parsing() {
        let envelope: Envelope<ActorRunInfo> = serde_json::from_value(json!({
            "data": {"id": "run1", "status": "SUCCEEDED", "defaultDatasetId": "ds1", "actId": "x"}
        }))
        .unwrap();
        let run = envelope.data.unwrap();
        assert_eq!(run.id.as_deref(), Some("run1"));
        assert_eq!(run.default_dataset_id.as_deref(), Some("ds1"));
    }

    #[test]
    fn test_url_building() {
        let c = client("https://api.apify.com/v2");
        assert_eq!(
            c.runs_url("clockworks/tiktok-scraper"),
            "https://api.apify.com/v2/acts/clockworks~tiktok-scraper/runs"
        );
        assert_eq!(
            c.runs_url("apify~instagram-scraper"),
            "https://api.apify.com/v2/acts/apify~instagram-scraper/runs"
        );
        assert_eq!(c.run_url("r1"), "https://api.apify.com/v2/actor-runs/r1");
        assert_eq!(c.dataset_url("d1"), "https://api.apify.com/v2/datasets/d1/items");
    }

    #[test]
    fn test_empty_token_rejected() {
        let result = ApifyClient::new(" ", "http://x", Duration::from_secs(1), Duration::from_secs(1));
        assert!(matches!(result, Err(CoreError::ConfigurationMissing(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_propagates() {
        let c = client("http://127.0.0.1:1");
        let result: CoreResult<Vec<Value>> = c.run_actor("apify~instagram-scraper", json!({})).await;
        assert!(matches!(result, Err(CoreError::TransportError(_))));
    }

    #[test]
    fn test_from_config_applies_polling_settings() {
        let mut config = PipelineConfig::default();
        config.credentials.set(CredentialKind::Apify, "tok");
        config.scrape.poll_interval_secs = 2;
        config.scrape.max_wait_secs = 45;

        let client = ApifyClient::from_config(&config).unwrap();
        assert_eq!(client.poll_interval, Duration::from_secs(2));
        assert_eq!(client.max_wait, Duration::from_secs(45));
    }
}
