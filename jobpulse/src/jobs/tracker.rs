//! The Job Tracking Engine.

use super::poller::run_poll_loop;
use super::record::{format_elapsed, JobRecord, StatusChange};
use super::TrackerError;
use crate::api::{ApiError, JobApi, JobState, JobStatus, JobUpload, SubmitOptions};
use crate::config::JobSettings;
use crate::sink::{Alert, AlertSink};
use crate::stop::StopToken;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A spawned loop paired with its stop token.
struct PollHandle {
    stop: StopToken,
    task: JoinHandle<()>,
}

/// What the poll loop should do after a status was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LoopDirective {
    /// Keep polling.
    Continue,
    /// The job reached a terminal state (or vanished); stop the loop.
    Finished,
}

/// Shared engine state. Owned by [`JobTracker`] clones and borrowed by the
/// spawned poll loops.
pub(super) struct TrackerCore {
    pub(super) api: Arc<dyn JobApi>,
    pub(super) sink: Arc<dyn AlertSink>,
    pub(super) settings: JobSettings,
    records: RwLock<HashMap<String, JobRecord>>,
    loops: RwLock<HashMap<String, PollHandle>>,
    retirements: RwLock<HashMap<String, PollHandle>>,
}

/// Client-resident tracker for server-executed jobs.
///
/// The tracker owns the job registry: it registers a job at submission,
/// polls its status on a per-job loop with adaptive backoff, raises alerts
/// on lifecycle transitions, and retires completed records after a grace
/// period. Consumers read cloned snapshots and call the imperative
/// operations; nothing outside the engine mutates a record.
///
/// Cloning is cheap and shares the engine.
///
/// # Example
///
/// ```rust,no_run
/// use jobpulse::api::{HttpClient, JobUpload, SubmitOptions};
/// use jobpulse::config::Config;
/// use jobpulse::jobs::JobTracker;
/// use jobpulse::sink::TracingSink;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::load()?;
/// let client = Arc::new(HttpClient::new(&config.http)?);
/// let tracker = JobTracker::new(client, Arc::new(TracingSink), config.jobs);
///
/// let upload = JobUpload::new("report.pdf", std::fs::read("report.pdf")?);
/// let job_id = tracker.submit(upload, SubmitOptions::default()).await?;
/// println!("tracking {job_id}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct JobTracker {
    core: Arc<TrackerCore>,
}

impl JobTracker {
    /// Create a tracker with injected API client and alert sink.
    #[must_use]
    pub fn new(api: Arc<dyn JobApi>, sink: Arc<dyn AlertSink>, settings: JobSettings) -> Self {
        Self {
            core: Arc::new(TrackerCore {
                api,
                sink,
                settings,
                records: RwLock::new(HashMap::new()),
                loops: RwLock::new(HashMap::new()),
                retirements: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Submit a file for processing and start tracking the resulting job.
    ///
    /// The first status poll fires immediately, not after one interval.
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns the API error if the submission is rejected; no record is
    /// created and the failure is raised through the sink once.
    pub async fn submit(
        &self,
        upload: JobUpload,
        options: SubmitOptions,
    ) -> Result<String, TrackerError> {
        let filename = upload.filename.clone();

        let submitted = match self.core.api.submit(upload, &options).await {
            Ok(submitted) => submitted,
            Err(err) => {
                error!(%filename, error = %err, "job submission rejected");
                self.core
                    .sink
                    .alert(Alert::error("Upload failed", format!("{filename}: {err}")));
                return Err(err.into());
            }
        };

        let job_id = submitted.job_id;
        self.core.records.write().insert(
            job_id.clone(),
            JobRecord::new(job_id.clone(), filename.clone(), Utc::now()),
        );

        info!(%job_id, %filename, "job submitted");
        self.core.sink.alert(Alert::info(
            "Upload started",
            format!("{filename} was submitted for processing"),
        ));

        TrackerCore::start_loop(&self.core, &job_id);
        Ok(job_id)
    }

    /// Cancel a tracked job.
    ///
    /// On success the poll loop stops and the local record is forced to
    /// `cancelled`. Client-predicted transition: with the loop stopped, no
    /// later poll reconciles a diverging server verdict; [`Self::retry`]
    /// re-enters authoritative polling.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::UnknownJob`] for an untracked id, or the API
    /// error if the server rejects the cancellation (local state is left
    /// unchanged).
    pub async fn cancel(&self, job_id: &str) -> Result<(), TrackerError> {
        let filename = self
            .core
            .records
            .read()
            .get(job_id)
            .map(|record| record.filename.clone())
            .ok_or_else(|| TrackerError::UnknownJob(job_id.to_string()))?;

        if let Err(err) = self.core.api.cancel(job_id).await {
            error!(%job_id, error = %err, "cancel rejected");
            self.core
                .sink
                .alert(Alert::error("Cancel failed", format!("{filename}: {err}")));
            return Err(err.into());
        }

        self.core.stop_loop(job_id);
        {
            let mut records = self.core.records.write();
            if let Some(record) = records.get_mut(job_id) {
                record.polling = false;
                match &mut record.status {
                    Some(status) => status.state = JobState::Cancelled,
                    None => {
                        record.status = Some(JobStatus {
                            id: job_id.to_string(),
                            state: JobState::Cancelled,
                            filename: filename.clone(),
                            progress: None,
                            completed_at: None,
                            error_message: None,
                        });
                    }
                }
            }
        }

        info!(%job_id, "job cancelled");
        self.core.sink.alert(Alert::warning(
            "Job cancelled",
            format!("{filename} was cancelled"),
        ));
        Ok(())
    }

    /// Ask the server to run a failed job again and resume polling.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::UnknownJob`] for an untracked id, or the API
    /// error if the server rejects the retry (local state is left
    /// unchanged).
    pub async fn retry(&self, job_id: &str) -> Result<(), TrackerError> {
        let filename = self
            .core
            .records
            .read()
            .get(job_id)
            .map(|record| record.filename.clone())
            .ok_or_else(|| TrackerError::UnknownJob(job_id.to_string()))?;

        if let Err(err) = self.core.api.retry(job_id).await {
            error!(%job_id, error = %err, "retry rejected");
            self.core
                .sink
                .alert(Alert::error("Retry failed", format!("{filename}: {err}")));
            return Err(err.into());
        }

        self.core.stop_retirement(job_id);
        let restart = {
            let mut records = self.core.records.write();
            records.get_mut(job_id).is_some_and(|record| {
                record.error = None;
                if record.polling {
                    false
                } else {
                    record.polling = true;
                    // Deliberate user-action transition back into the active
                    // lifecycle; the next poll is authoritative.
                    if let Some(status) = &mut record.status {
                        status.state = JobState::Pending;
                        status.completed_at = None;
                        status.error_message = None;
                    }
                    true
                }
            })
        };

        if restart {
            TrackerCore::start_loop(&self.core, job_id);
        }

        info!(%job_id, "retry requested");
        self.core.sink.alert(Alert::info(
            "Retry requested",
            format!("{filename} was queued again"),
        ));
        Ok(())
    }

    /// Stop tracking a job: stop its loop and timers, delete its record.
    ///
    /// Idempotent; safe to call on an id that was never tracked.
    pub fn remove_job(&self, job_id: &str) {
        self.core.remove(job_id);
    }

    /// Remove every record in a terminal state, leaving pending and
    /// processing jobs untouched. Returns how many were removed.
    pub fn clear_completed_jobs(&self) -> usize {
        let terminal: Vec<String> = self
            .core
            .records
            .read()
            .values()
            .filter(|record| record.is_terminal())
            .map(|record| record.job_id.clone())
            .collect();

        for job_id in &terminal {
            self.core.remove(job_id);
        }
        terminal.len()
    }

    /// Snapshot of every tracked job, oldest first.
    #[must_use]
    pub fn jobs(&self) -> Vec<JobRecord> {
        let mut jobs: Vec<JobRecord> = self.core.records.read().values().cloned().collect();
        jobs.sort_by_key(|record| record.started_at);
        jobs
    }

    /// Snapshot of one job.
    #[must_use]
    pub fn job(&self, job_id: &str) -> Option<JobRecord> {
        self.core.records.read().get(job_id).cloned()
    }

    /// Snapshot of jobs that have not reached a terminal state, oldest
    /// first.
    #[must_use]
    pub fn active_jobs(&self) -> Vec<JobRecord> {
        let mut jobs: Vec<JobRecord> = self
            .core
            .records
            .read()
            .values()
            .filter(|record| !record.is_terminal())
            .cloned()
            .collect();
        jobs.sort_by_key(|record| record.started_at);
        jobs
    }

    /// Whether any tracked job is still pending or processing.
    #[must_use]
    pub fn has_active_jobs(&self) -> bool {
        self.core
            .records
            .read()
            .values()
            .any(|record| !record.is_terminal())
    }

    /// Number of tracked jobs that completed successfully.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.count_in_state(JobState::Completed)
    }

    /// Number of tracked jobs that failed.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count_in_state(JobState::Failed)
    }

    /// Human-readable duration for a job, `"0s"` for an unknown id.
    #[must_use]
    pub fn job_duration(&self, job_id: &str) -> String {
        self.core
            .records
            .read()
            .get(job_id)
            .map_or_else(|| format_elapsed(0), |record| record.duration_text(Utc::now()))
    }

    /// Stop every poll loop and retirement timer.
    ///
    /// Call on teardown; a dropped tracker with live loops would leak
    /// timers into the runtime.
    pub fn shutdown(&self) {
        let loops: Vec<PollHandle> = {
            let mut map = self.core.loops.write();
            map.drain().map(|(_, handle)| handle).collect()
        };
        let retirements: Vec<PollHandle> = {
            let mut map = self.core.retirements.write();
            map.drain().map(|(_, handle)| handle).collect()
        };

        for handle in loops.into_iter().chain(retirements) {
            handle.stop.stop();
            handle.task.abort();
        }

        for record in self.core.records.write().values_mut() {
            record.polling = false;
        }
        debug!("job tracker shut down");
    }

    fn count_in_state(&self, state: JobState) -> usize {
        self.core
            .records
            .read()
            .values()
            .filter(|record| record.state() == Some(state))
            .count()
    }
}

impl TrackerCore {
    /// Whether the record exists and is marked polling.
    pub(super) fn is_polling(&self, job_id: &str) -> bool {
        self.records
            .read()
            .get(job_id)
            .is_some_and(|record| record.polling)
    }

    /// Spawn the poll loop for a job unless one is already live.
    pub(super) fn start_loop(core: &Arc<Self>, job_id: &str) {
        let mut loops = core.loops.write();
        if let Some(existing) = loops.get(job_id) {
            if !existing.task.is_finished() {
                debug!(%job_id, "poll loop already active");
                return;
            }
        }

        let stop = StopToken::new();
        let task = tokio::spawn(run_poll_loop(
            Arc::clone(core),
            job_id.to_string(),
            stop.clone(),
        ));
        loops.insert(job_id.to_string(), PollHandle { stop, task });
    }

    /// Stop a job's poll loop if one is live.
    pub(super) fn stop_loop(&self, job_id: &str) {
        if let Some(handle) = self.loops.write().remove(job_id) {
            handle.stop.stop();
        }
    }

    /// Stop a job's pending retirement timer if one is live.
    pub(super) fn stop_retirement(&self, job_id: &str) {
        if let Some(handle) = self.retirements.write().remove(job_id) {
            handle.stop.stop();
        }
    }

    /// Drop a loop's own registry entry, unless a restarted loop already
    /// replaced it.
    pub(super) fn finish_loop(&self, job_id: &str, stop: &StopToken) {
        let mut loops = self.loops.write();
        if loops
            .get(job_id)
            .is_some_and(|handle| handle.stop.same_token(stop))
        {
            loops.remove(job_id);
        }
    }

    /// Apply a fetched status and raise the matching alerts.
    pub(super) fn note_status(core: &Arc<Self>, job_id: &str, status: JobStatus) -> LoopDirective {
        let applied = {
            let mut records = core.records.write();
            let Some(record) = records.get_mut(job_id) else {
                warn!(%job_id, "status response for an untracked job");
                return LoopDirective::Finished;
            };

            match record.apply(status) {
                StatusChange::Ignored => None,
                StatusChange::Progressed(state) => Some((
                    state,
                    record.filename.clone(),
                    record.elapsed_secs(Utc::now()),
                    record
                        .status
                        .as_ref()
                        .and_then(|status| status.error_message.clone()),
                )),
            }
        };

        let Some((state, filename, elapsed, error_message)) = applied else {
            return LoopDirective::Continue;
        };

        match state {
            JobState::Completed => {
                info!(%job_id, %filename, elapsed_secs = elapsed, "job completed");
                core.sink.alert(
                    Alert::success(
                        "Processing complete",
                        format!("{filename} finished in {}", format_elapsed(elapsed)),
                    )
                    .persistent(),
                );
                Self::schedule_retirement(core, job_id);
                LoopDirective::Finished
            }
            JobState::Failed => {
                let message = error_message
                    .unwrap_or_else(|| "the server reported an unknown error".to_string());
                warn!(%job_id, %filename, %message, "job failed");
                core.sink.alert(
                    Alert::error("Processing failed", format!("{filename}: {message}"))
                        .persistent(),
                );
                LoopDirective::Finished
            }
            JobState::Cancelled => {
                // Server-side cancellation observed by polling; the explicit
                // cancel() path already alerted.
                debug!(%job_id, "job reported cancelled");
                LoopDirective::Finished
            }
            JobState::Pending | JobState::Processing => {
                debug!(%job_id, state = %state, "job in flight");
                LoopDirective::Continue
            }
        }
    }

    /// Record a polling-transport error on the job.
    pub(super) fn note_poll_error(&self, job_id: &str, err: &ApiError) {
        if let Some(record) = self.records.write().get_mut(job_id) {
            record.error = Some(err.to_string());
        }
    }

    /// Remove the record after the retirement grace period, unless the job
    /// is removed or retried first.
    fn schedule_retirement(core: &Arc<Self>, job_id: &str) {
        let mut retirements = core.retirements.write();
        if let Some(existing) = retirements.get(job_id) {
            if !existing.task.is_finished() {
                return;
            }
        }

        let stop = StopToken::new();
        let grace = core.settings.retire_after();
        let task = tokio::spawn({
            let core = Arc::clone(core);
            let job_id = job_id.to_string();
            let stop = stop.clone();
            async move {
                tokio::select! {
                    () = stop.stopped() => return,
                    () = tokio::time::sleep(grace) => {}
                }
                debug!(%job_id, "retiring completed job");
                core.remove(&job_id);
            }
        });
        retirements.insert(job_id.to_string(), PollHandle { stop, task });
    }

    /// Stop everything associated with a job and delete its record.
    pub(super) fn remove(&self, job_id: &str) {
        self.stop_loop(job_id);
        self.stop_retirement(job_id);
        self.records.write().remove(job_id);
    }
}
