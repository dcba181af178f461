//! Server-emitted notification records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a server-emitted notification.
///
/// Unknown wire values deserialize to [`Self::Other`]; new categories are
/// silent in the UI until explicitly mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// A job finished successfully.
    JobCompleted,
    /// A job failed permanently.
    JobFailed,
    /// A job is being retried.
    JobRetry,
    /// A job was cancelled.
    JobCancelled,
    /// Any category this client does not know.
    #[serde(other)]
    Other,
}

impl NotificationType {
    /// Whether this category describes job activity. Used as the idle/busy
    /// heuristic for the polling cadence.
    #[must_use]
    pub const fn is_job_event(self) -> bool {
        !matches!(self, Self::Other)
    }

    /// Display name of the category.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::JobCompleted => "job_completed",
            Self::JobFailed => "job_failed",
            Self::JobRetry => "job_retry",
            Self::JobCancelled => "job_cancelled",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One server-emitted notification event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    /// Identity; the dedup key.
    pub id: String,
    /// Associated job, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Category.
    pub notification_type: NotificationType,
    /// Short headline.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Whether the user has read it.
    #[serde(default)]
    pub is_read: bool,
    /// When it was read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    /// Whether it survives automatic clearing.
    #[serde(default)]
    pub is_persistent: bool,
    /// When the server emitted it.
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    /// Age of the notification at `now`.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }

    /// Mark the record read at `now`. No-op if already read.
    pub(crate) fn mark_read(&mut self, now: DateTime<Utc>) {
        if !self.is_read {
            self.is_read = true;
            self.read_at = Some(now);
        }
    }
}
