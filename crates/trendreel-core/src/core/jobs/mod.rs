//! Long-Running Job Poller
//!
//! Bounded polling of remote batch jobs (scraper actor runs): start once,
//! check status on a fixed interval, fetch results on success.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::core::{CoreError, CoreResult};

// =============================================================================
// Job Types
// =============================================================================

/// Snapshot of a remote job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "camelCase")]
pub enum JobState {
    /// Still queued or running
    Running,
    /// Finished; carries the reference needed to fetch results
    Succeeded(String),
    /// Ended without results; carries the remote state name
    Terminal(String),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Running)
    }
}

/// A remote job that is started once and then polled
#[async_trait]
pub trait PollableJob: Send + Sync {
    type Output: Send;

    /// Short label used in logs
    fn label(&self) -> &str;

    /// Starts the job and returns its identifier
    async fn start(&self) -> CoreResult<String>;

    /// Checks the job once
    async fn status(&self, job_id: &str) -> CoreResult<JobState>;

    /// Fetches the results of a succeeded job
    async fn fetch(&self, result_ref: &str) -> CoreResult<Self::Output>;
}

// =============================================================================
// Poll Loop
// =============================================================================

/// Runs a job to completion.
///
/// Fails with `JobFailed` on a terminal non-success state and with
/// `JobTimedOut` once `max_wait` has elapsed without a terminal state.
pub async fn run_to_completion<J: PollableJob + ?Sized>(
    job: &J,
    poll_interval: Duration,
    max_wait: Duration,
) -> CoreResult<J::Output> {
    let job_id = job.start().await?;
    info!("{} job started: {}", job.label(), job_id);

    let deadline = Instant::now() + max_wait;
    loop {
        match job.status(&job_id).await? {
            JobState::Succeeded(result_ref) => {
                info!("{} job {} succeeded, fetching {}", job.label(), job_id, result_ref);
                return job.fetch(&result_ref).await;
            }
            JobState::Terminal(state) => {
                warn!("{} job {} ended with {}", job.label(), job_id, state);
                return Err(CoreError::JobFailed { job_id, state });
            }
            JobState::Running => {
                debug!("{} job {} still running", job.label(), job_id);
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(CoreError::JobTimedOut {
                job_id,
                waited_secs: max_wait.as_secs(),
            });
        }
        tokio::time::sleep(poll_interval.min(deadline - now)).await;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reports `Running` a fixed number of times, then `last`
    struct ScriptedJob {
        running_polls: usize,
        last: JobState,
        polls: AtomicUsize,
    }

    impl ScriptedJob {
        fn new(running_polls: usize, last: JobState) -> Self {
            Self {
                running_polls,
                last,
                polls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PollableJob for ScriptedJob {
        type Output = Vec<String>;

        fn label(&self) -> &str {
            "scripted"
        }

        async fn start(&self) -> CoreResult<String> {
            Ok("run-1".to_string())
        }

        async fn status(&self, _job_id: &str) -> CoreResult<JobState> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            if n < self.running_polls {
                Ok(JobState::Running)
            } else {
                Ok(self.last.clone())
            }
        }

        async fn fetch(&self, result_ref: &str) -> CoreResult<Vec<String>> {
            Ok(vec![format!("item-from-{}", result_ref)])
        }
    }

    #[tokio::test]
    async fn test_success_fetches_results() {
        let job = ScriptedJob::new(2, JobState::Succeeded("ds-9".to_string()));
        let items = run_to_completion(&job, Duration::from_millis(5), Duration::from_secs(2))
            .await
            .unwrap();

        assert_eq!(items, vec!["item-from-ds-9"]);
        assert_eq!(job.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_terminal_failure() {
        let job = ScriptedJob::new(1, JobState::Terminal("ABORTED".to_string()));
        let err = run_to_completion(&job, Duration::from_millis(5), Duration::from_secs(2))
            .await
            .unwrap_err();

        match err {
            CoreError::JobFailed { job_id, state } => {
                assert_eq!(job_id, "run-1");
                assert_eq!(state, "ABORTED");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let job = ScriptedJob::new(usize::MAX, JobState::Running);
        let err = run_to_completion(&job, Duration::from_millis(10), Duration::from_millis(60))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::JobTimedOut { .. }));
        assert!(job.polls.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn test_job_state_terminality() {
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Succeeded("d".to_string()).is_terminal());
        assert!(JobState::Terminal("FAILED".to_string()).is_terminal());
    }
}
