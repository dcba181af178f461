//! The Notification Polling & Delivery Engine.

use super::error::NotifyError;
use super::record::{NotificationRecord, NotificationType};
use super::store::NotificationStore;
use crate::api::{NotificationApi, NotificationFilter};
use crate::config::NotificationSettings;
use crate::sink::{Alert, AlertSink};
use crate::stop::StopToken;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

struct PollerHandle {
    stop: StopToken,
    task: JoinHandle<()>,
}

struct CenterCore {
    api: Arc<dyn NotificationApi>,
    sink: Arc<dyn AlertSink>,
    settings: NotificationSettings,
    store: RwLock<NotificationStore>,
    poller: Mutex<Option<PollerHandle>>,
    /// Best-effort signal derived from job-typed records in the last
    /// fetched batch; decides the next tick's cadence regime.
    jobs_active: AtomicBool,
    initialized: AtomicBool,
}

/// Polls the notification feed on a single shared loop and delivers fresh,
/// presentable notifications to the sink without duplicates or stale
/// alerts.
///
/// The loop runs in one of two regimes sharing one base interval: every
/// tick while there is observed job activity or unread backlog, every Nth
/// tick otherwise. Merging is set-union keyed by id, so a record is
/// forwarded to the sink at most once per process lifetime.
///
/// Cloning is cheap and shares the engine.
#[derive(Clone)]
pub struct NotificationCenter {
    core: Arc<CenterCore>,
}

impl NotificationCenter {
    /// Create a center with injected API client and alert sink.
    #[must_use]
    pub fn new(
        api: Arc<dyn NotificationApi>,
        sink: Arc<dyn AlertSink>,
        settings: NotificationSettings,
    ) -> Self {
        Self {
            core: Arc::new(CenterCore {
                api,
                sink,
                settings,
                store: RwLock::new(NotificationStore::new()),
                poller: Mutex::new(None),
                jobs_active: AtomicBool::new(false),
                initialized: AtomicBool::new(false),
            }),
        }
    }

    /// One-time startup: fetch the most recent notifications, start the
    /// poll loop, then prune stale read records, in that order.
    ///
    /// Idempotent: repeat calls (from any clone) are no-ops. The bootstrap
    /// fetch merges silently (restarts never replay old alerts), and a
    /// failed bootstrap still starts the loop.
    pub async fn initialize(&self) {
        if self.core.initialized.swap(true, Ordering::SeqCst) {
            debug!("notification center already initialized");
            return;
        }

        let filter = NotificationFilter::recent(self.core.settings.initial_fetch_limit);
        if let Err(err) = self.fetch_notifications(&filter).await {
            warn!(error = %err, "bootstrap notification fetch failed");
        }

        self.start_polling();

        let pruned = self.clear_old_notifications();
        if pruned > 0 {
            debug!(pruned, "pruned stale read notifications at startup");
        }
    }

    /// Start the shared poll loop. No-op if it is already running.
    ///
    /// Must be called within a Tokio runtime.
    pub fn start_polling(&self) {
        let mut poller = self.core.poller.lock();
        if let Some(handle) = poller.as_ref() {
            if !handle.task.is_finished() {
                debug!("notification polling already active");
                return;
            }
        }

        info!("starting notification polling");
        let stop = StopToken::new();
        let task = tokio::spawn(CenterCore::run_poll_loop(
            Arc::clone(&self.core),
            stop.clone(),
        ));
        *poller = Some(PollerHandle { stop, task });
    }

    /// Stop the shared poll loop. The loop observes the stop signal at its
    /// next suspension point; an in-flight fetch is discarded on resume.
    pub fn stop_polling(&self) {
        if let Some(handle) = self.core.poller.lock().take() {
            info!("stopping notification polling");
            handle.stop.stop();
        }
    }

    /// Whether the shared poll loop is currently running.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.core
            .poller
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.task.is_finished())
    }

    /// Fetch notifications matching `filter` and merge them into the
    /// store. Returns the records that were not previously present.
    ///
    /// This is a silent merge: nothing is forwarded to the sink. Only the
    /// poll loop raises alerts.
    ///
    /// # Errors
    ///
    /// Returns the API error if the fetch fails; the store is unchanged.
    pub async fn fetch_notifications(
        &self,
        filter: &NotificationFilter,
    ) -> Result<Vec<NotificationRecord>, NotifyError> {
        let page = self.core.api.notifications(filter).await?;
        Ok(self.core.store.write().merge(&page.notifications))
    }

    /// Mark one notification read on the server, then locally.
    ///
    /// Not optimistic: on failure the local record keeps its state.
    ///
    /// # Errors
    ///
    /// Returns the API error if the server rejects the update.
    pub async fn mark_as_read(&self, id: &str) -> Result<(), NotifyError> {
        if let Err(err) = self.core.api.mark_read(id).await {
            error!(%id, error = %err, "mark-read rejected");
            self.core.sink.alert(Alert::error(
                "Notification update failed",
                err.to_string(),
            ));
            return Err(err.into());
        }

        self.core.store.write().mark_read(id, Utc::now());
        Ok(())
    }

    /// Mark several notifications read on the server, then locally.
    ///
    /// # Errors
    ///
    /// Returns the API error if the server rejects the update; local state
    /// is left unchanged.
    pub async fn mark_multiple_as_read(&self, ids: &[String]) -> Result<(), NotifyError> {
        if ids.is_empty() {
            return Ok(());
        }

        if let Err(err) = self.core.api.mark_many_read(ids).await {
            error!(count = ids.len(), error = %err, "bulk mark-read rejected");
            self.core.sink.alert(Alert::error(
                "Notification update failed",
                err.to_string(),
            ));
            return Err(err.into());
        }

        self.core.store.write().mark_many_read(ids, Utc::now());
        Ok(())
    }

    /// Mark every notification read on the server, then locally.
    ///
    /// # Errors
    ///
    /// Returns the API error if the server rejects the update; local state
    /// is left unchanged.
    pub async fn mark_all_as_read(&self) -> Result<(), NotifyError> {
        if let Err(err) = self.core.api.mark_all_read().await {
            error!(error = %err, "mark-all-read rejected");
            self.core.sink.alert(Alert::error(
                "Notification update failed",
                err.to_string(),
            ));
            return Err(err.into());
        }

        self.core.store.write().mark_all_read(Utc::now());
        Ok(())
    }

    /// Purge read notifications older than the configured prune age.
    /// Unread records are retained regardless. Returns how many were
    /// removed.
    pub fn clear_old_notifications(&self) -> usize {
        let cutoff = Utc::now() - self.core.settings.prune_age();
        self.core.store.write().prune_read_before(cutoff)
    }

    /// Whether a notification is fresh and presentable.
    ///
    /// Deliberate allow-list: only `job_completed` and `job_failed` ever
    /// surface, and nothing older than the freshness window does. New
    /// categories stay silent until added here.
    #[must_use]
    pub fn should_show_in_ui(&self, record: &NotificationRecord, now: DateTime<Utc>) -> bool {
        CenterCore::presentable(&self.core, record, now)
    }

    /// Snapshot of every stored notification, first-seen order.
    #[must_use]
    pub fn notifications(&self) -> Vec<NotificationRecord> {
        self.core.store.read().snapshot()
    }

    /// Snapshot of unread notifications.
    #[must_use]
    pub fn unread(&self) -> Vec<NotificationRecord> {
        self.core.store.read().unread_records()
    }

    /// Snapshot of unread notifications flagged persistent.
    #[must_use]
    pub fn persistent_unread(&self) -> Vec<NotificationRecord> {
        self.core.store.read().persistent_unread()
    }

    /// Number of unread notifications, derived from the store.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.core.store.read().unread_count()
    }

    /// Stop the poll loop and abort its task. Call on teardown.
    pub fn shutdown(&self) {
        if let Some(handle) = self.core.poller.lock().take() {
            handle.stop.stop();
            handle.task.abort();
        }
        debug!("notification center shut down");
    }
}

impl CenterCore {
    /// The shared poll loop. The first tick always polls; later ticks obey
    /// the regime: every tick while active, every Nth tick while idle.
    async fn run_poll_loop(core: Arc<Self>, stop: StopToken) {
        let interval = core.settings.poll_interval();
        let idle_every = core.settings.idle_poll_every.max(1);
        let mut tick: u64 = 0;

        loop {
            if stop.is_stopped() {
                break;
            }

            tick += 1;
            let fast = core.jobs_active.load(Ordering::Relaxed)
                || core.store.read().unread_count() > 0;
            let eligible = fast || tick == 1 || tick.is_multiple_of(idle_every);

            if eligible {
                Self::poll_once(&core).await;
                if stop.is_stopped() {
                    break;
                }
            } else {
                trace!(tick, "idle regime, skipping poll");
            }

            tokio::select! {
                () = stop.stopped() => break,
                () = tokio::time::sleep(interval) => {}
            }
        }

        debug!("notification poll loop exited");
    }

    /// One eligible tick: check the unread count, fetch the unread batch
    /// when there is one, merge, and forward fresh presentable records.
    ///
    /// Fetch failures are logged and retried on the next eligible tick;
    /// they never tear the loop down and never reach the sink.
    async fn poll_once(core: &Arc<Self>) {
        let count = match core.api.unread_count().await {
            Ok(unread) => unread.count,
            Err(err) => {
                warn!(error = %err, "unread-count poll failed");
                return;
            }
        };

        if count == 0 {
            // Nothing unread is also the end of the activity evidence
            core.jobs_active.store(false, Ordering::Relaxed);
            return;
        }

        let page = match core.api.notifications(&NotificationFilter::unread()).await {
            Ok(page) => page,
            Err(err) => {
                warn!(error = %err, "notification fetch failed");
                return;
            }
        };

        // Job churn in the batch suggests more is coming; run fast for now
        let jobs_active = page
            .notifications
            .iter()
            .any(|record| record.notification_type.is_job_event());
        core.jobs_active.store(jobs_active, Ordering::Relaxed);

        let fresh = core.store.write().merge(&page.notifications);
        if fresh.is_empty() {
            return;
        }

        debug!(fresh = fresh.len(), server_unread = page.unread_count, "merged notifications");
        let now = Utc::now();
        for record in &fresh {
            if !record.is_read && Self::presentable(core, record, now) {
                Self::show(core, record);
            }
        }
    }

    fn presentable(core: &Arc<Self>, record: &NotificationRecord, now: DateTime<Utc>) -> bool {
        if record.age(now) > core.settings.freshness_window() {
            return false;
        }
        matches!(
            record.notification_type,
            NotificationType::JobCompleted | NotificationType::JobFailed
        )
    }

    /// Map a notification category onto a presentation channel.
    fn show(core: &Arc<Self>, record: &NotificationRecord) {
        let title = record.title.clone();
        let message = record.message.clone();
        let alert = match record.notification_type {
            NotificationType::JobCompleted => Alert::success(title, message)
                .with_duration(Duration::from_millis(5_000)),
            NotificationType::JobFailed => Alert::error(title, message).persistent(),
            NotificationType::JobRetry => Alert::warning(title, message)
                .with_duration(Duration::from_millis(4_000)),
            NotificationType::JobCancelled => Alert::info(title, message)
                .with_duration(Duration::from_millis(3_000)),
            NotificationType::Other => Alert::info(title, message)
                .with_duration(Duration::from_millis(4_000)),
        };
        core.sink.alert(alert);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemorySink, ScriptedNotificationApi};

    fn center_with(sink: Arc<MemorySink>) -> NotificationCenter {
        NotificationCenter::new(
            Arc::new(ScriptedNotificationApi::new()),
            sink,
            NotificationSettings::default(),
        )
    }

    fn record(id: &str, kind: NotificationType, created_at: DateTime<Utc>) -> NotificationRecord {
        NotificationRecord {
            id: id.to_string(),
            job_id: None,
            notification_type: kind,
            title: "t".to_string(),
            message: "m".to_string(),
            is_read: false,
            read_at: None,
            is_persistent: false,
            created_at,
        }
    }

    #[test]
    fn test_should_show_allow_list() {
        let center = center_with(Arc::new(MemorySink::new()));
        let now = Utc::now();

        assert!(center.should_show_in_ui(&record("a", NotificationType::JobCompleted, now), now));
        assert!(center.should_show_in_ui(&record("b", NotificationType::JobFailed, now), now));
        assert!(!center.should_show_in_ui(&record("c", NotificationType::JobRetry, now), now));
        assert!(!center.should_show_in_ui(&record("d", NotificationType::JobCancelled, now), now));
        assert!(!center.should_show_in_ui(&record("e", NotificationType::Other, now), now));
    }

    #[test]
    fn test_should_show_rejects_stale() {
        let center = center_with(Arc::new(MemorySink::new()));
        let now = Utc::now();
        let stale = now - chrono::Duration::seconds(61);
        let fresh = now - chrono::Duration::seconds(59);

        assert!(!center.should_show_in_ui(&record("a", NotificationType::JobCompleted, stale), now));
        assert!(center.should_show_in_ui(&record("b", NotificationType::JobCompleted, fresh), now));
    }

    #[test]
    fn test_presentation_mapping() {
        let sink = Arc::new(MemorySink::new());
        let center = center_with(Arc::clone(&sink));
        let now = Utc::now();

        for kind in [
            NotificationType::JobCompleted,
            NotificationType::JobFailed,
            NotificationType::JobRetry,
            NotificationType::JobCancelled,
            NotificationType::Other,
        ] {
            CenterCore::show(&center.core, &record("x", kind, now));
        }

        let alerts = sink.alerts();
        assert_eq!(alerts.len(), 5);

        assert_eq!(alerts[0].kind, crate::sink::AlertKind::Success);
        assert_eq!(alerts[0].duration, Some(Duration::from_millis(5_000)));
        assert!(!alerts[0].persistent);

        assert_eq!(alerts[1].kind, crate::sink::AlertKind::Error);
        assert!(alerts[1].persistent);

        assert_eq!(alerts[2].kind, crate::sink::AlertKind::Warning);
        assert_eq!(alerts[2].duration, Some(Duration::from_millis(4_000)));

        assert_eq!(alerts[3].kind, crate::sink::AlertKind::Info);
        assert_eq!(alerts[3].duration, Some(Duration::from_millis(3_000)));

        assert_eq!(alerts[4].kind, crate::sink::AlertKind::Info);
        assert_eq!(alerts[4].duration, Some(Duration::from_millis(4_000)));
    }
}
