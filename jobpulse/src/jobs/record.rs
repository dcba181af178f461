//! Client-side job records.

use crate::api::{JobState, JobStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One tracked job.
///
/// Records live in the tracker's registry from submission until retirement
/// (30 s after completion) or explicit removal. The registry is the single
/// source of truth for job state on the client; consumers only ever see
/// cloned snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Identifier assigned by the server; immutable after creation.
    pub job_id: String,
    /// Filename of the submitted payload, kept for user-facing messages.
    pub filename: String,
    /// Last status fetched from the server; `None` before the first poll.
    pub status: Option<JobStatus>,
    /// Whether a poll loop is currently active for this job.
    pub polling: bool,
    /// Last polling-transport error. Distinct from a job-failure status:
    /// this is the client failing to ask, not the job failing to run.
    pub error: Option<String>,
    /// When the job was submitted.
    pub started_at: DateTime<Utc>,
}

/// Result of feeding a fetched status into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StatusChange {
    /// The record now carries the given state.
    Progressed(JobState),
    /// The response was discarded (wrong job id, or an illegal regression
    /// out of a terminal state).
    Ignored,
}

impl JobRecord {
    /// Create a record for a freshly submitted job.
    #[must_use]
    pub fn new(job_id: impl Into<String>, filename: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            job_id: job_id.into(),
            filename: filename.into(),
            status: None,
            polling: true,
            error: None,
            started_at,
        }
    }

    /// Current lifecycle state, if any status has been observed.
    #[must_use]
    pub fn state(&self) -> Option<JobState> {
        self.status.as_ref().map(|status| status.state)
    }

    /// Whether the job has reached a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state().is_some_and(JobState::is_terminal)
    }

    /// Apply a fetched status.
    ///
    /// Protocol anomalies are defensive no-ops: a response for a different
    /// job id, or a status that would move the record out of a terminal
    /// state, is logged and discarded rather than applied.
    pub(crate) fn apply(&mut self, status: JobStatus) -> StatusChange {
        if status.id != self.job_id {
            warn!(
                job_id = %self.job_id,
                response_id = %status.id,
                "discarding status response for a different job"
            );
            return StatusChange::Ignored;
        }

        if self.is_terminal() && !status.state.is_terminal() {
            warn!(
                job_id = %self.job_id,
                current = %self.state().map_or("?", JobState::name),
                incoming = %status.state,
                "discarding terminal-state regression"
            );
            return StatusChange::Ignored;
        }

        self.error = None;
        let state = status.state;
        self.status = Some(status);
        if state.is_terminal() {
            self.polling = false;
        }
        StatusChange::Progressed(state)
    }

    /// Seconds elapsed between submission and `completed_at`, falling back
    /// to `now` while the job is still running.
    #[must_use]
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> i64 {
        let end = self
            .status
            .as_ref()
            .and_then(|status| status.completed_at)
            .unwrap_or(now);
        (end - self.started_at).num_seconds().max(0)
    }

    /// Human-readable duration, e.g. `"30s"` or `"1m 5s"`.
    #[must_use]
    pub fn duration_text(&self, now: DateTime<Utc>) -> String {
        format_elapsed(self.elapsed_secs(now))
    }
}

/// Format a second count as `"{s}s"` under a minute, `"{m}m {s}s"` above,
/// omitting a trailing `0s`.
#[must_use]
pub fn format_elapsed(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < 60 {
        return format!("{seconds}s");
    }

    let minutes = seconds / 60;
    let rest = seconds % 60;
    if rest == 0 {
        format!("{minutes}m")
    } else {
        format!("{minutes}m {rest}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn status(id: &str, state: JobState) -> JobStatus {
        JobStatus {
            id: id.to_string(),
            state,
            filename: "report.pdf".to_string(),
            progress: None,
            completed_at: None,
            error_message: None,
        }
    }

    #[test]
    fn test_new_record_has_no_status() {
        let record = JobRecord::new("job-1", "report.pdf", Utc::now());
        assert!(record.status.is_none());
        assert!(record.polling);
        assert!(record.error.is_none());
        assert!(!record.is_terminal());
    }

    #[test]
    fn test_apply_progresses_and_clears_error() {
        let mut record = JobRecord::new("job-1", "report.pdf", Utc::now());
        record.error = Some("timeout".to_string());

        let change = record.apply(status("job-1", JobState::Processing));
        assert_eq!(change, StatusChange::Progressed(JobState::Processing));
        assert!(record.error.is_none());
        assert!(record.polling);
    }

    #[test]
    fn test_apply_terminal_stops_polling() {
        let mut record = JobRecord::new("job-1", "report.pdf", Utc::now());
        record.apply(status("job-1", JobState::Completed));
        assert!(!record.polling);
        assert!(record.is_terminal());
    }

    #[test]
    fn test_apply_rejects_wrong_job_id() {
        let mut record = JobRecord::new("job-1", "report.pdf", Utc::now());
        let change = record.apply(status("job-9", JobState::Processing));
        assert_eq!(change, StatusChange::Ignored);
        assert!(record.status.is_none());
    }

    #[test]
    fn test_apply_rejects_terminal_regression() {
        let mut record = JobRecord::new("job-1", "report.pdf", Utc::now());
        record.apply(status("job-1", JobState::Completed));

        let change = record.apply(status("job-1", JobState::Processing));
        assert_eq!(change, StatusChange::Ignored);
        assert_eq!(record.state(), Some(JobState::Completed));
    }

    #[test]
    fn test_terminal_to_terminal_is_allowed() {
        // cancel() forces a local `cancelled`; a late poll may still report
        // the server's terminal verdict
        let mut record = JobRecord::new("job-1", "report.pdf", Utc::now());
        record.apply(status("job-1", JobState::Cancelled));

        let change = record.apply(status("job-1", JobState::Failed));
        assert_eq!(change, StatusChange::Progressed(JobState::Failed));
    }

    #[test]
    fn test_elapsed_uses_completed_at_when_present() {
        let started = Utc::now();
        let mut record = JobRecord::new("job-1", "report.pdf", started);

        let mut completed = status("job-1", JobState::Completed);
        completed.completed_at = Some(started + chrono::Duration::seconds(3));
        record.apply(completed);

        // `now` far in the future must not matter once completed_at is set
        let later = started + chrono::Duration::hours(2);
        assert_eq!(record.duration_text(later), "3s");
    }

    #[test]
    fn test_duration_formatting() {
        assert_eq!(format_elapsed(0), "0s");
        assert_eq!(format_elapsed(30), "30s");
        assert_eq!(format_elapsed(59), "59s");
        assert_eq!(format_elapsed(60), "1m");
        assert_eq!(format_elapsed(65), "1m 5s");
        assert_eq!(format_elapsed(120), "2m");
        assert_eq!(format_elapsed(-5), "0s");
    }

    proptest! {
        #[test]
        fn prop_format_elapsed_round_trips_seconds(seconds in 0i64..86_400) {
            let text = format_elapsed(seconds);

            let parsed = if let Some((minutes, rest)) = text.split_once("m") {
                let minutes: i64 = minutes.parse().unwrap();
                let rest = rest.trim();
                let secs: i64 = if rest.is_empty() {
                    0
                } else {
                    rest.trim_end_matches('s').parse().unwrap()
                };
                minutes * 60 + secs
            } else {
                text.trim_end_matches('s').parse().unwrap()
            };

            prop_assert_eq!(parsed, seconds);
        }
    }
}
