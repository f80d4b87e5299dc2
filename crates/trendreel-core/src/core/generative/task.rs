//! Uniform Generation Task
//!
//! Every provider adapter answers `submit` and `poll` with a [`GenerationTask`]
//! snapshot. Provider vocabularies collapse into four [`TaskStatus`] values.
//!
//! Wire shape:
//!
//! ```json
//! {"platform": "RunwayML", "model": "veo3.1", "task_id": "abc", "status": "pending", "video_url": null}
//! ```
//!
//! `task_id` and `video_url` are always present (null when absent); `error` only
//! appears on `failed`/`error` snapshots.

use serde::{Deserialize, Serialize};

use crate::core::CoreError;

// =============================================================================
// Task Status
// =============================================================================

/// Lifecycle state of a remote generation task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Queued, running, throttled, rendering...
    Pending,
    /// Terminal success; the URL is always populated
    Succeeded { video_url: String },
    /// Terminal failure reported by the provider (including cancellation)
    Failed { error: String },
    /// Local fault: network, unexpected shape or missing credential
    Error { error: String },
}

impl TaskStatus {
    /// Wire label for the status
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Succeeded { .. } => "succeeded",
            TaskStatus::Failed { .. } => "failed",
            TaskStatus::Error { .. } => "error",
        }
    }

    /// Whether polling again can change the outcome
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Pending)
    }

    pub fn video_url(&self) -> Option<&str> {
        match self {
            TaskStatus::Succeeded { video_url } => Some(video_url),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            TaskStatus::Failed { error } | TaskStatus::Error { error } => Some(error),
            _ => None,
        }
    }

    /// Success with a URL, or an unexpected-shape error when the URL is missing
    pub fn succeeded_with(video_url: Option<String>) -> Self {
        match video_url.filter(|u| !u.trim().is_empty()) {
            Some(video_url) => TaskStatus::Succeeded { video_url },
            None => TaskStatus::Error {
                error: "Unexpected response shape: success without a video URL".to_string(),
            },
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Generation Task
// =============================================================================

/// Snapshot of one provider task. Never cached: each poll builds a fresh one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "TaskRecord", try_from = "TaskRecord")]
pub struct GenerationTask {
    pub platform: String,
    pub model: String,
    /// Absent when submission failed
    pub task_id: Option<String>,
    pub status: TaskStatus,
    /// Narration text sent with an avatar submission
    pub spoken_script: Option<String>,
    /// Background slot label (`A`/`B`)
    pub slot: Option<String>,
}

impl GenerationTask {
    /// Accepted submission, awaiting completion
    pub fn pending(
        platform: impl Into<String>,
        model: impl Into<String>,
        task_id: impl Into<String>,
    ) -> Self {
        Self::with_status(platform, model, Some(task_id.into()), TaskStatus::Pending)
    }

    /// Local failure with no provider task behind it
    pub fn error(
        platform: impl Into<String>,
        model: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self::with_status(
            platform,
            model,
            None,
            TaskStatus::Error {
                error: error.into(),
            },
        )
    }

    pub fn with_status(
        platform: impl Into<String>,
        model: impl Into<String>,
        task_id: Option<String>,
        status: TaskStatus,
    ) -> Self {
        Self {
            platform: platform.into(),
            model: model.into(),
            task_id,
            status,
            spoken_script: None,
            slot: None,
        }
    }

    /// Folds a fallible submission into a task snapshot
    pub fn from_submit(
        platform: &str,
        model: &str,
        result: Result<String, CoreError>,
    ) -> Self {
        match result {
            Ok(task_id) => Self::pending(platform, model, task_id),
            Err(e) => Self::error(platform, model, e.to_string()),
        }
    }

    /// Folds a fallible poll into a task snapshot, keeping the task id on error
    pub fn from_poll(
        platform: &str,
        model: &str,
        task_id: &str,
        result: Result<TaskStatus, CoreError>,
    ) -> Self {
        let status = result.unwrap_or_else(|e| TaskStatus::Error {
            error: e.to_string(),
        });
        Self::with_status(platform, model, Some(task_id.to_string()), status)
    }

    pub fn with_spoken_script(mut self, script: impl Into<String>) -> Self {
        self.spoken_script = Some(script.into());
        self
    }

    pub fn with_slot(mut self, slot: impl Into<String>) -> Self {
        self.slot = Some(slot.into());
        self
    }

    pub fn video_url(&self) -> Option<&str> {
        self.status.video_url()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.status.error()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// =============================================================================
// Wire Record
// =============================================================================

/// Flat serialized form of [`GenerationTask`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TaskRecord {
    platform: String,
    model: String,
    task_id: Option<String>,
    status: String,
    video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    spoken_script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    slot: Option<String>,
}

impl From<GenerationTask> for TaskRecord {
    fn from(task: GenerationTask) -> Self {
        let status = task.status.as_str().to_string();
        let (video_url, error) = match task.status {
            TaskStatus::Pending => (None, None),
            TaskStatus::Succeeded { video_url } => (Some(video_url), None),
            TaskStatus::Failed { error } | TaskStatus::Error { error } => (None, Some(error)),
        };
        Self {
            platform: task.platform,
            model: task.model,
            task_id: task.task_id,
            status,
            video_url,
            error,
            spoken_script: task.spoken_script,
            slot: task.slot,
        }
    }
}

impl TryFrom<TaskRecord> for GenerationTask {
    type Error = String;

    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        let status = match record.status.as_str() {
            "pending" => TaskStatus::Pending,
            "succeeded" => TaskStatus::Succeeded {
                video_url: record
                    .video_url
                    .ok_or_else(|| "succeeded task without video_url".to_string())?,
            },
            "failed" => TaskStatus::Failed {
                error: record.error.unwrap_or_default(),
            },
            "error" => TaskStatus::Error {
                error: record.error.unwrap_or_default(),
            },
            other => return Err(format!("Unknown task status: {}", other)),
        };
        Ok(Self {
            platform: record.platform,
            model: record.model,
            task_id: record.task_id,
            status,
            spoken_script: record.spoken_script,
            slot: record.slot,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
