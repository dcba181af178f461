//! Notification Polling Engine tests.
//!
//! Paused-clock suites covering the dual-regime cadence, dedup merging,
//! exactly-once forwarding, and the non-optimistic mark-read operations.

use chrono::Utc;
use jobpulse::api::NotificationFilter;
use jobpulse::config::NotificationSettings;
use jobpulse::notifications::{NotificationCenter, NotificationType, NotifyError};
use jobpulse::sink::AlertKind;
use jobpulse::testing::{notification, MemorySink, ScriptedNotificationApi};
use std::sync::Arc;
use std::time::Duration;

fn center_with(api: Arc<ScriptedNotificationApi>, sink: Arc<MemorySink>) -> NotificationCenter {
    NotificationCenter::new(api, sink, NotificationSettings::default())
}

async fn settle() {
    for _ in 0..25 {
        tokio::task::yield_now().await;
    }
}

async fn advance(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
    settle().await;
}

#[tokio::test(start_paused = true)]
async fn idle_regime_polls_on_ticks_one_and_six() {
    let api = Arc::new(ScriptedNotificationApi::new());
    let center = center_with(Arc::clone(&api), Arc::new(MemorySink::new()));

    center.start_polling();
    settle().await;

    // Tick 1 always polls; the count comes back 0, so the engine idles
    assert_eq!(api.count_call_count(), 1);
    assert!(api.page_calls().is_empty(), "zero unread means no full fetch");

    // Ticks 2-5: skipped
    for _ in 0..4 {
        advance(5_000).await;
        assert_eq!(api.count_call_count(), 1);
    }

    // Tick 6: polls again
    advance(5_000).await;
    assert_eq!(api.count_call_count(), 2);

    // Ticks 7-11 skipped, tick 12 polls
    for _ in 0..6 {
        advance(5_000).await;
    }
    assert_eq!(api.count_call_count(), 3);

    center.shutdown();
}

#[tokio::test(start_paused = true)]
async fn unread_backlog_switches_to_fast_regime() {
    let api = Arc::new(ScriptedNotificationApi::new());
    let sink = Arc::new(MemorySink::new());
    api.push_count(1);
    api.push_page(vec![notification(
        "n-1",
        NotificationType::JobCompleted,
        Utc::now(),
    )]);

    let center = center_with(Arc::clone(&api), Arc::clone(&sink));
    center.start_polling();
    settle().await;

    assert_eq!(api.count_call_count(), 1);
    assert_eq!(center.unread_count(), 1);

    // Unread backlog: every tick polls now
    advance(5_000).await;
    assert_eq!(api.count_call_count(), 2);
    advance(5_000).await;
    assert_eq!(api.count_call_count(), 3);

    center.shutdown();
}

#[tokio::test(start_paused = true)]
async fn repeated_batches_forward_each_record_once() {
    let api = Arc::new(ScriptedNotificationApi::new());
    let sink = Arc::new(MemorySink::new());
    api.push_count(1);
    // The same unread record comes back on every fetch
    api.push_page(vec![notification(
        "n-1",
        NotificationType::JobCompleted,
        Utc::now(),
    )]);

    let center = center_with(Arc::clone(&api), Arc::clone(&sink));
    center.start_polling();
    settle().await;

    assert_eq!(sink.count_of(AlertKind::Success), 1);
    assert_eq!(center.notifications().len(), 1);

    // Several more fast-regime ticks re-fetch the identical batch
    for _ in 0..3 {
        advance(5_000).await;
    }

    assert!(api.count_call_count() >= 4);
    assert_eq!(center.notifications().len(), 1, "merge must not duplicate");
    assert_eq!(
        sink.count_of(AlertKind::Success),
        1,
        "an already-seen record is never re-shown"
    );

    center.shutdown();
}

#[tokio::test(start_paused = true)]
async fn stale_and_unmapped_types_stay_silent() {
    let api = Arc::new(ScriptedNotificationApi::new());
    let sink = Arc::new(MemorySink::new());
    let now = Utc::now();

    api.push_count(4);
    api.push_page(vec![
        notification("stale", NotificationType::JobCompleted, now - chrono::Duration::seconds(120)),
        notification("retry", NotificationType::JobRetry, now),
        notification("failed", NotificationType::JobFailed, now),
        notification("other", NotificationType::Other, now),
    ]);

    let center = center_with(Arc::clone(&api), Arc::clone(&sink));
    center.start_polling();
    settle().await;

    // All four are merged and count as unread...
    assert_eq!(center.notifications().len(), 4);
    assert_eq!(center.unread_count(), 4);

    // ...but only the fresh job_failed is presentable
    let alerts = sink.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::Error);
    assert!(alerts[0].persistent);

    center.shutdown();
}

#[tokio::test(start_paused = true)]
async fn transient_poll_failures_never_reach_the_sink() {
    let api = Arc::new(ScriptedNotificationApi::new());
    let sink = Arc::new(MemorySink::new());
    api.push_count_err("gateway timeout");
    api.push_count(0);

    let center = center_with(Arc::clone(&api), Arc::clone(&sink));
    center.start_polling();
    settle().await;

    // Tick 1 failed; nothing surfaced, loop alive
    assert_eq!(api.count_call_count(), 1);
    assert!(sink.is_empty());
    assert!(center.is_polling());

    // Idle cadence continues: tick 6 polls again and succeeds
    for _ in 0..5 {
        advance(5_000).await;
    }
    assert_eq!(api.count_call_count(), 2);
    assert!(sink.is_empty());

    center.shutdown();
}

#[tokio::test(start_paused = true)]
async fn start_polling_is_idempotent() {
    let api = Arc::new(ScriptedNotificationApi::new());
    let center = center_with(Arc::clone(&api), Arc::new(MemorySink::new()));

    center.start_polling();
    center.start_polling();
    center.start_polling();
    settle().await;

    assert_eq!(api.count_call_count(), 1, "one shared loop, not three");
    assert!(center.is_polling());

    center.stop_polling();
    settle().await;
    assert!(!center.is_polling());

    // No further polls after stop
    advance(30_000).await;
    advance(30_000).await;
    assert_eq!(api.count_call_count(), 1);

    // A stopped engine can be started again
    center.start_polling();
    settle().await;
    assert_eq!(api.count_call_count(), 2);

    center.shutdown();
}

#[tokio::test(start_paused = true)]
async fn initialize_bootstraps_silently_and_latches() {
    let api = Arc::new(ScriptedNotificationApi::new());
    let sink = Arc::new(MemorySink::new());
    let now = Utc::now();

    // Bootstrap page: one stale read record and one fresh unread completion
    let mut old_read = notification("old", NotificationType::JobCompleted, now - chrono::Duration::hours(25));
    old_read.is_read = true;
    old_read.read_at = Some(now - chrono::Duration::hours(25));
    api.push_page(vec![
        old_read,
        notification("fresh", NotificationType::JobCompleted, now),
    ]);

    let center = center_with(Arc::clone(&api), Arc::clone(&sink));
    center.initialize().await;
    settle().await;

    // Bootstrap fetched the most recent 50, read or not
    let bootstrap = &api.page_calls()[0];
    assert!(!bootstrap.unread_only);
    assert_eq!(bootstrap.limit, Some(50));

    // Fetch happened before polling started, prune ran after
    assert!(center.is_polling());
    let ids: Vec<String> = center.notifications().iter().map(|n| n.id.clone()).collect();
    assert_eq!(ids, vec!["fresh".to_string()], "stale read record was pruned");

    // The bootstrap merge never alerts, even for fresh presentable records
    assert!(sink.is_empty(), "restart must not replay old toasts");

    // Second initialize is a no-op: no second bootstrap fetch
    center.initialize().await;
    settle().await;
    let bootstrap_fetches = api
        .page_calls()
        .iter()
        .filter(|filter| !filter.unread_only)
        .count();
    assert_eq!(bootstrap_fetches, 1);

    center.shutdown();
}

#[tokio::test(start_paused = true)]
async fn mark_read_is_not_optimistic() {
    let api = Arc::new(ScriptedNotificationApi::new());
    let sink = Arc::new(MemorySink::new());
    let now = Utc::now();
    api.push_page(vec![
        notification("n-1", NotificationType::JobCompleted, now),
        notification("n-2", NotificationType::JobFailed, now),
        notification("n-3", NotificationType::JobRetry, now),
    ]);

    let center = center_with(Arc::clone(&api), Arc::clone(&sink));
    center
        .fetch_notifications(&NotificationFilter::recent(50))
        .await
        .unwrap();
    assert_eq!(center.unread_count(), 3);

    // Server rejects: local state untouched, error surfaced, call recorded
    api.push_mark_err("session expired");
    let result = center.mark_as_read("n-1").await;
    assert!(matches!(result, Err(NotifyError::Api(_))));
    assert_eq!(center.unread_count(), 3);
    assert_eq!(sink.count_of(AlertKind::Error), 1);
    assert_eq!(api.mark_read_calls(), vec!["n-1".to_string()]);

    // Server accepts: local record flips
    center.mark_as_read("n-1").await.unwrap();
    assert_eq!(center.unread_count(), 2);
    let n1 = center
        .notifications()
        .into_iter()
        .find(|record| record.id == "n-1")
        .unwrap();
    assert!(n1.is_read);
    assert!(n1.read_at.is_some());

    // Bulk marks
    center
        .mark_multiple_as_read(&["n-2".to_string(), "missing".to_string()])
        .await
        .unwrap();
    assert_eq!(center.unread_count(), 1);
    assert_eq!(api.mark_many_calls().len(), 1);

    center.mark_all_as_read().await.unwrap();
    assert_eq!(center.unread_count(), 0);
    assert_eq!(api.mark_all_calls(), 1);

    // Never negative, no matter how often it is repeated
    center.mark_all_as_read().await.unwrap();
    assert_eq!(center.unread_count(), 0);

    assert_eq!(center.unread().len(), 0);
}

#[tokio::test(start_paused = true)]
async fn unread_views_track_the_store() {
    let api = Arc::new(ScriptedNotificationApi::new());
    let center = center_with(Arc::clone(&api), Arc::new(MemorySink::new()));
    let now = Utc::now();

    let mut sticky = notification("sticky", NotificationType::JobFailed, now);
    sticky.is_persistent = true;
    api.push_page(vec![
        notification("plain", NotificationType::JobCompleted, now),
        sticky,
    ]);

    center
        .fetch_notifications(&NotificationFilter::recent(50))
        .await
        .unwrap();

    assert_eq!(center.unread().len(), 2);
    let persistent = center.persistent_unread();
    assert_eq!(persistent.len(), 1);
    assert_eq!(persistent[0].id, "sticky");

    center.mark_as_read("sticky").await.unwrap();
    assert!(center.persistent_unread().is_empty());
    assert_eq!(center.unread().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn job_activity_heuristic_keeps_the_fast_regime() {
    let api = Arc::new(ScriptedNotificationApi::new());
    let sink = Arc::new(MemorySink::new());

    // Tick 1: one unread job event; every later count is zero. The batch
    // itself signals job activity, so tick 2 still polls.
    api.push_count(1);
    api.push_count(0);
    api.push_page(vec![notification(
        "n-1",
        NotificationType::JobCancelled,
        Utc::now(),
    )]);

    let center = center_with(Arc::clone(&api), Arc::clone(&sink));
    center.start_polling();
    settle().await;
    assert_eq!(api.count_call_count(), 1);

    // The record is unread in the store, so the backlog alone keeps the
    // regime fast; mark it read to isolate the activity heuristic.
    center.mark_as_read("n-1").await.unwrap();
    assert_eq!(center.unread_count(), 0);

    advance(5_000).await;
    assert_eq!(
        api.count_call_count(),
        2,
        "job-typed batch must keep the next tick fast"
    );

    // That tick saw zero unread and no batch; the engine settles back into
    // the idle cadence
    advance(5_000).await;
    assert_eq!(api.count_call_count(), 2);

    center.shutdown();
}
