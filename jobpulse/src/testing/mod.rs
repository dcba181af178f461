//! Test doubles for engine consumers.
//!
//! Scripted in-memory implementations of the remote API contracts plus a
//! capturing sink, so engine behavior can be exercised without a server,
//! in this crate's own tests and in downstream code. Pair them with
//! `#[tokio::test(start_paused = true)]` to drive every timing assertion
//! deterministically.

use crate::api::{
    ApiError, JobApi, JobState, JobStatus, JobUpload, NotificationApi, NotificationFilter,
    NotificationPage, SubmitOptions, SubmittedJob, UnreadCount,
};
use crate::notifications::{NotificationRecord, NotificationType};
use crate::sink::{Alert, AlertKind, AlertSink};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tokio::time::Instant;

type Scripted<T> = Result<T, String>;

fn transport(err: &str) -> ApiError {
    ApiError::Transport(err.to_string())
}

/// Pop the next scripted entry, repeating the last one forever.
fn pop_repeating<T: Clone>(queue: &mut VecDeque<Scripted<T>>) -> Option<Scripted<T>> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

/// Build a minimal status report for tests.
#[must_use]
pub fn status(id: &str, state: JobState) -> JobStatus {
    JobStatus {
        id: id.to_string(),
        state,
        filename: "report.pdf".to_string(),
        progress: None,
        completed_at: None,
        error_message: None,
    }
}

/// Build a minimal unread notification for tests.
#[must_use]
pub fn notification(
    id: &str,
    kind: NotificationType,
    created_at: DateTime<Utc>,
) -> NotificationRecord {
    NotificationRecord {
        id: id.to_string(),
        job_id: None,
        notification_type: kind,
        title: format!("{kind} {id}"),
        message: format!("notification {id}"),
        is_read: false,
        read_at: None,
        is_persistent: false,
        created_at,
    }
}

/// Scripted [`JobApi`] fake.
///
/// Submissions and per-job status responses are queues the test fills in
/// advance; the last status entry repeats forever so "completed from here
/// on" needs a single entry. Each `get_status` call is recorded with its
/// (tokio) timestamp, which is what the backoff-progression assertions
/// read.
#[derive(Default)]
pub struct ScriptedJobApi {
    submits: Mutex<VecDeque<Scripted<String>>>,
    statuses: Mutex<HashMap<String, VecDeque<Scripted<JobStatus>>>>,
    cancels: Mutex<VecDeque<Scripted<()>>>,
    retries: Mutex<VecDeque<Scripted<()>>>,
    status_calls: Mutex<Vec<(String, Instant)>>,
    cancel_calls: Mutex<Vec<String>>,
    retry_calls: Mutex<Vec<String>>,
}

impl ScriptedJobApi {
    /// Create a fake with no scripted responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful submission returning `job_id`.
    pub fn push_submit_ok(&self, job_id: &str) {
        self.submits.lock().push_back(Ok(job_id.to_string()));
    }

    /// Script a rejected submission.
    pub fn push_submit_err(&self, message: &str) {
        self.submits.lock().push_back(Err(message.to_string()));
    }

    /// Script the next status response for a job.
    pub fn push_status(&self, job_id: &str, status: JobStatus) {
        self.statuses
            .lock()
            .entry(job_id.to_string())
            .or_default()
            .push_back(Ok(status));
    }

    /// Script a transport failure for a job's next status poll.
    pub fn push_status_err(&self, job_id: &str, message: &str) {
        self.statuses
            .lock()
            .entry(job_id.to_string())
            .or_default()
            .push_back(Err(message.to_string()));
    }

    /// Script the next cancel outcome (defaults to success when empty).
    pub fn push_cancel_err(&self, message: &str) {
        self.cancels.lock().push_back(Err(message.to_string()));
    }

    /// Script the next retry outcome (defaults to success when empty).
    pub fn push_retry_err(&self, message: &str) {
        self.retries.lock().push_back(Err(message.to_string()));
    }

    /// Timestamps of every `get_status` call for a job, in call order.
    #[must_use]
    pub fn status_call_times(&self, job_id: &str) -> Vec<Instant> {
        self.status_calls
            .lock()
            .iter()
            .filter(|(id, _)| id == job_id)
            .map(|(_, at)| *at)
            .collect()
    }

    /// Number of `get_status` calls for a job.
    #[must_use]
    pub fn status_call_count(&self, job_id: &str) -> usize {
        self.status_call_times(job_id).len()
    }

    /// Jobs that were asked to cancel.
    #[must_use]
    pub fn cancel_calls(&self) -> Vec<String> {
        self.cancel_calls.lock().clone()
    }

    /// Jobs that were asked to retry.
    #[must_use]
    pub fn retry_calls(&self) -> Vec<String> {
        self.retry_calls.lock().clone()
    }
}

#[async_trait]
impl JobApi for ScriptedJobApi {
    async fn submit(
        &self,
        _upload: JobUpload,
        _options: &SubmitOptions,
    ) -> Result<SubmittedJob, ApiError> {
        match self.submits.lock().pop_front() {
            Some(Ok(job_id)) => Ok(SubmittedJob { job_id }),
            Some(Err(message)) => Err(transport(&message)),
            None => Err(transport("no scripted submission")),
        }
    }

    async fn get_status(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        self.status_calls
            .lock()
            .push((job_id.to_string(), Instant::now()));

        let scripted = {
            let mut statuses = self.statuses.lock();
            statuses
                .get_mut(job_id)
                .and_then(pop_repeating)
        };

        match scripted {
            Some(Ok(status)) => Ok(status),
            Some(Err(message)) => Err(transport(&message)),
            None => Err(transport("no scripted status")),
        }
    }

    async fn cancel(&self, job_id: &str) -> Result<(), ApiError> {
        self.cancel_calls.lock().push(job_id.to_string());
        match self.cancels.lock().pop_front() {
            Some(Ok(())) | None => Ok(()),
            Some(Err(message)) => Err(transport(&message)),
        }
    }

    async fn retry(&self, job_id: &str) -> Result<(), ApiError> {
        self.retry_calls.lock().push(job_id.to_string());
        match self.retries.lock().pop_front() {
            Some(Ok(())) | None => Ok(()),
            Some(Err(message)) => Err(transport(&message)),
        }
    }
}

/// Scripted [`NotificationApi`] fake.
///
/// The unread-count and page scripts repeat their last entry forever; an
/// empty script answers "nothing unread". Mark-read calls succeed unless a
/// failure is scripted, and every call is recorded.
#[derive(Default)]
pub struct ScriptedNotificationApi {
    counts: Mutex<VecDeque<Scripted<u64>>>,
    pages: Mutex<VecDeque<Scripted<NotificationPage>>>,
    mark_results: Mutex<VecDeque<Scripted<()>>>,
    count_calls: Mutex<Vec<Instant>>,
    page_calls: Mutex<Vec<NotificationFilter>>,
    mark_read_calls: Mutex<Vec<String>>,
    mark_many_calls: Mutex<Vec<Vec<String>>>,
    mark_all_calls: Mutex<usize>,
}

impl ScriptedNotificationApi {
    /// Create a fake with no scripted responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next unread-count response.
    pub fn push_count(&self, count: u64) {
        self.counts.lock().push_back(Ok(count));
    }

    /// Script a transport failure for the next unread-count poll.
    pub fn push_count_err(&self, message: &str) {
        self.counts.lock().push_back(Err(message.to_string()));
    }

    /// Script the next notification page from a batch of records.
    pub fn push_page(&self, records: Vec<NotificationRecord>) {
        let unread_count = records.iter().filter(|record| !record.is_read).count() as u64;
        let total_count = records.len() as u64;
        self.pages.lock().push_back(Ok(NotificationPage {
            notifications: records,
            unread_count,
            total_count,
        }));
    }

    /// Script a transport failure for the next page fetch.
    pub fn push_page_err(&self, message: &str) {
        self.pages.lock().push_back(Err(message.to_string()));
    }

    /// Script a failure for the next mark-read call (any flavor).
    pub fn push_mark_err(&self, message: &str) {
        self.mark_results.lock().push_back(Err(message.to_string()));
    }

    /// Timestamps of every unread-count call.
    #[must_use]
    pub fn count_call_times(&self) -> Vec<Instant> {
        self.count_calls.lock().clone()
    }

    /// Number of unread-count calls.
    #[must_use]
    pub fn count_call_count(&self) -> usize {
        self.count_calls.lock().len()
    }

    /// Filters passed to every page fetch, in call order.
    #[must_use]
    pub fn page_calls(&self) -> Vec<NotificationFilter> {
        self.page_calls.lock().clone()
    }

    /// Ids passed to single mark-read calls.
    #[must_use]
    pub fn mark_read_calls(&self) -> Vec<String> {
        self.mark_read_calls.lock().clone()
    }

    /// Id batches passed to bulk mark-read calls.
    #[must_use]
    pub fn mark_many_calls(&self) -> Vec<Vec<String>> {
        self.mark_many_calls.lock().clone()
    }

    /// Number of mark-all-read calls.
    #[must_use]
    pub fn mark_all_calls(&self) -> usize {
        *self.mark_all_calls.lock()
    }

    fn pop_mark(&self) -> Result<(), ApiError> {
        match self.mark_results.lock().pop_front() {
            Some(Ok(())) | None => Ok(()),
            Some(Err(message)) => Err(transport(&message)),
        }
    }
}

#[async_trait]
impl NotificationApi for ScriptedNotificationApi {
    async fn unread_count(&self) -> Result<UnreadCount, ApiError> {
        self.count_calls.lock().push(Instant::now());

        let scripted = {
            let mut counts = self.counts.lock();
            pop_repeating(&mut counts)
        };

        match scripted {
            Some(Ok(count)) => Ok(UnreadCount { count }),
            Some(Err(message)) => Err(transport(&message)),
            None => Ok(UnreadCount { count: 0 }),
        }
    }

    async fn notifications(
        &self,
        filter: &NotificationFilter,
    ) -> Result<NotificationPage, ApiError> {
        self.page_calls.lock().push(filter.clone());

        let scripted = {
            let mut pages = self.pages.lock();
            pop_repeating(&mut pages)
        };

        match scripted {
            Some(Ok(page)) => Ok(page),
            Some(Err(message)) => Err(transport(&message)),
            None => Ok(NotificationPage {
                notifications: Vec::new(),
                unread_count: 0,
                total_count: 0,
            }),
        }
    }

    async fn mark_read(&self, id: &str) -> Result<(), ApiError> {
        self.mark_read_calls.lock().push(id.to_string());
        self.pop_mark()
    }

    async fn mark_many_read(&self, ids: &[String]) -> Result<(), ApiError> {
        self.mark_many_calls.lock().push(ids.to_vec());
        self.pop_mark()
    }

    async fn mark_all_read(&self) -> Result<(), ApiError> {
        *self.mark_all_calls.lock() += 1;
        self.pop_mark()
    }
}

/// Capturing [`AlertSink`] for assertions.
#[derive(Default)]
pub struct MemorySink {
    alerts: Mutex<Vec<Alert>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every alert delivered so far, in order.
    #[must_use]
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().clone()
    }

    /// Alerts of one kind, in order.
    #[must_use]
    pub fn of_kind(&self, kind: AlertKind) -> Vec<Alert> {
        self.alerts
            .lock()
            .iter()
            .filter(|alert| alert.kind == kind)
            .cloned()
            .collect()
    }

    /// Number of alerts of one kind.
    #[must_use]
    pub fn count_of(&self, kind: AlertKind) -> usize {
        self.of_kind(kind).len()
    }

    /// Total number of alerts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.alerts.lock().len()
    }

    /// Whether no alert has been delivered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alerts.lock().is_empty()
    }

    /// Forget everything delivered so far.
    pub fn clear(&self) {
        self.alerts.lock().clear();
    }
}

impl AlertSink for MemorySink {
    fn alert(&self, alert: Alert) {
        self.alerts.lock().push(alert);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_status_repeats_last_entry() {
        let api = ScriptedJobApi::new();
        api.push_status("job-1", status("job-1", JobState::Processing));
        api.push_status("job-1", status("job-1", JobState::Completed));

        assert_eq!(
            api.get_status("job-1").await.unwrap().state,
            JobState::Processing
        );
        assert_eq!(
            api.get_status("job-1").await.unwrap().state,
            JobState::Completed
        );
        // Last entry repeats
        assert_eq!(
            api.get_status("job-1").await.unwrap().state,
            JobState::Completed
        );
    }

    #[tokio::test]
    async fn test_unscripted_count_is_zero() {
        let api = ScriptedNotificationApi::new();
        assert_eq!(api.unread_count().await.unwrap().count, 0);
        assert_eq!(api.count_call_count(), 1);
    }

    #[test]
    fn test_memory_sink_filters_by_kind() {
        let sink = MemorySink::new();
        sink.alert(Alert::success("a", "b"));
        sink.alert(Alert::error("c", "d"));
        sink.alert(Alert::success("e", "f"));

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.count_of(AlertKind::Success), 2);
        assert_eq!(sink.count_of(AlertKind::Warning), 0);
    }
}
