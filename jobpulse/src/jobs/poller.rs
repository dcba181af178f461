//! The per-job status poll loop.
//!
//! One loop per tracked job, spawned at submission (or by a retry). A tick
//! issues `get_status`, dispatches on the answer, then re-arms: a new
//! tick's call is never issued while the previous tick's response is still
//! pending. Transport failures lengthen the interval multiplicatively up to
//! the configured cap; a successful poll resets it to the base cadence.

use super::tracker::{LoopDirective, TrackerCore};
use crate::stop::StopToken;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Drive one job's poll loop until the job stops being tracked, reaches a
/// terminal state, or the stop token fires.
///
/// The first poll fires immediately; the interval only paces subsequent
/// ticks. The token is re-checked on resume from every await so a response
/// that arrives for an already-stopped job is discarded, not applied.
pub(super) async fn run_poll_loop(core: Arc<TrackerCore>, job_id: String, stop: StopToken) {
    let base = core.settings.poll_interval();
    let cap = core.settings.backoff_cap();
    let factor = core.settings.backoff_factor;
    let mut interval = base;

    loop {
        if stop.is_stopped() || !core.is_polling(&job_id) {
            break;
        }

        match core.api.get_status(&job_id).await {
            Ok(status) => {
                // Cancellation may have landed while the call was in
                // flight; a resolved call for a stopped job is a no-op.
                if stop.is_stopped() || !core.is_polling(&job_id) {
                    break;
                }

                interval = base;
                match TrackerCore::note_status(&core, &job_id, status) {
                    LoopDirective::Continue => {}
                    LoopDirective::Finished => break,
                }
            }
            Err(err) => {
                if stop.is_stopped() {
                    break;
                }

                // Transient transport hiccup: keep trying forever, just
                // less often. Never user-visible.
                core.note_poll_error(&job_id, &err);
                interval = next_interval(interval, factor, cap);
                debug!(
                    %job_id,
                    error = %err,
                    next_poll_ms = interval.as_millis(),
                    "status poll failed, backing off"
                );
            }
        }

        tokio::select! {
            () = stop.stopped() => break,
            () = tokio::time::sleep(interval) => {}
        }
    }

    core.finish_loop(&job_id, &stop);
}

/// Next poll interval after a transport failure.
pub(super) fn next_interval(current: Duration, factor: f64, cap: Duration) -> Duration {
    current.mul_f64(factor.max(1.0)).min(cap)
}
