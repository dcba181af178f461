//! Remote API contracts.
//!
//! The engines never talk to a transport directly; they are handed
//! implementations of [`JobApi`] and [`NotificationApi`]. The
//! [`http`] submodule provides the production client; `crate::testing`
//! provides scripted fakes for tests.

mod http;

pub use http::HttpClient;

use crate::notifications::NotificationRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by remote API calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connection refused, timeout,
    /// DNS failure). Retryable.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status code.
    #[error("server returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, best effort.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Server-side lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Queued, not yet picked up by the executor.
    Pending,
    /// Currently executing.
    Processing,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Stopped by user request.
    Cancelled,
}

impl JobState {
    /// Check whether this state is terminal (no further polling occurs).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Wire/display name of the state.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Status report for a single job as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    /// Job identifier.
    pub id: String,
    /// Lifecycle state.
    #[serde(rename = "status")]
    pub state: JobState,
    /// Original filename of the submitted payload.
    pub filename: String,
    /// Completion percentage, if the executor reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    /// When the job finished, for terminal states.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Server-supplied failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Acknowledgement returned by a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedJob {
    /// Identifier assigned by the server.
    pub job_id: String,
}

/// Payload handed to [`JobApi::submit`].
#[derive(Debug, Clone)]
pub struct JobUpload {
    /// Filename presented to the server.
    pub filename: String,
    /// Optional MIME type.
    pub content_type: Option<String>,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl JobUpload {
    /// Create an upload from in-memory bytes.
    #[must_use]
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            bytes,
        }
    }

    /// Set the MIME type sent with the upload.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Caller-supplied submission options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOptions {
    /// Execution priority hint (higher = more important).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    /// URL the server calls back when the job finishes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

/// Unread-notification count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCount {
    /// Number of unread notifications for this client.
    pub count: u64,
}

/// Query filter for [`NotificationApi::notifications`].
#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    /// Only return unread notifications.
    pub unread_only: bool,
    /// Maximum number of records to return.
    pub limit: Option<u32>,
    /// Offset into the result set.
    pub offset: Option<u32>,
}

impl NotificationFilter {
    /// Filter for unread notifications only.
    #[must_use]
    pub fn unread() -> Self {
        Self {
            unread_only: true,
            ..Self::default()
        }
    }

    /// Filter for the most recent `limit` notifications, read or not.
    #[must_use]
    pub fn recent(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }
}

/// One page of notifications plus server-side bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPage {
    /// The records matching the filter.
    pub notifications: Vec<NotificationRecord>,
    /// Server's count of unread notifications.
    pub unread_count: u64,
    /// Server's total record count for the filter.
    pub total_count: u64,
}

/// Remote job executor contract.
///
/// Every call is a suspension point; implementations must be safe to invoke
/// concurrently from the tracker's per-job loops.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// Submit a file for processing.
    ///
    /// Implementations attach the process session id (see [`crate::session`])
    /// so the server can correlate jobs from one client instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is rejected or the transport fails.
    async fn submit(
        &self,
        upload: JobUpload,
        options: &SubmitOptions,
    ) -> Result<SubmittedJob, ApiError>;

    /// Fetch the current status of a job.
    ///
    /// # Errors
    ///
    /// Returns an error if the job is unknown to the server or the transport
    /// fails.
    async fn get_status(&self, job_id: &str) -> Result<JobStatus, ApiError>;

    /// Request cancellation of a job.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the cancellation.
    async fn cancel(&self, job_id: &str) -> Result<(), ApiError>;

    /// Request that a failed job be executed again.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the retry.
    async fn retry(&self, job_id: &str) -> Result<(), ApiError>;
}

/// Remote notification feed contract.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// Fetch the unread-notification count.
    ///
    /// The server caches this endpoint briefly; callers do not need to
    /// self-throttle beyond their own cadence.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails.
    async fn unread_count(&self) -> Result<UnreadCount, ApiError>;

    /// Fetch notifications matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails.
    async fn notifications(
        &self,
        filter: &NotificationFilter,
    ) -> Result<NotificationPage, ApiError>;

    /// Mark a single notification read.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the update.
    async fn mark_read(&self, id: &str) -> Result<(), ApiError>;

    /// Mark several notifications read.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the update.
    async fn mark_many_read(&self, ids: &[String]) -> Result<(), ApiError>;

    /// Mark every notification read.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the update.
    async fn mark_all_read(&self) -> Result<(), ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Processing.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
    }

    #[test]
    fn test_state_wire_names() {
        let json = serde_json::to_string(&JobState::Processing).unwrap();
        assert_eq!(json, "\"processing\"");

        let state: JobState = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(state, JobState::Cancelled);
    }

    #[test]
    fn test_job_status_decodes_camel_case() {
        let json = r#"{
            "id": "job-7",
            "status": "completed",
            "filename": "report.pdf",
            "completedAt": "2026-08-08T12:00:00Z"
        }"#;

        let status: JobStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.state, JobState::Completed);
        assert_eq!(status.filename, "report.pdf");
        assert!(status.completed_at.is_some());
        assert!(status.error_message.is_none());
    }

    #[test]
    fn test_filter_constructors() {
        let unread = NotificationFilter::unread();
        assert!(unread.unread_only);
        assert!(unread.limit.is_none());

        let recent = NotificationFilter::recent(50);
        assert!(!recent.unread_only);
        assert_eq!(recent.limit, Some(50));
    }
}
