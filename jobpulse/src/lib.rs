//! jobpulse: client-resident tracking for server-executed jobs
//!
//! Two engines around one presentation channel:
//!
//! - **[`jobs::JobTracker`]** registers submitted jobs, polls each one's
//!   status on its own loop with adaptive backoff, walks it through a small
//!   lifecycle state machine, and retires completed records after a grace
//!   period.
//! - **[`notifications::NotificationCenter`]** polls the notification feed
//!   on an independently paced shared loop, merges results into a
//!   deduplicated store, and forwards fresh, presentable notifications to
//!   the sink, exactly once each.
//!
//! Both engines take their API client and [`sink::AlertSink`] by injection;
//! there is no ambient global state beyond the per-process session id.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use jobpulse::api::{HttpClient, JobUpload, SubmitOptions};
//! use jobpulse::config::Config;
//! use jobpulse::jobs::JobTracker;
//! use jobpulse::notifications::NotificationCenter;
//! use jobpulse::sink::TracingSink;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     jobpulse::observability::init()?;
//!     let config = Config::load()?;
//!
//!     let client = Arc::new(HttpClient::new(&config.http)?);
//!     let sink = Arc::new(TracingSink);
//!
//!     let tracker = JobTracker::new(client.clone(), sink.clone(), config.jobs);
//!     let center = NotificationCenter::new(client, sink, config.notifications);
//!     center.initialize().await;
//!
//!     let upload = JobUpload::new("report.pdf", std::fs::read("report.pdf")?);
//!     let job_id = tracker.submit(upload, SubmitOptions::default()).await?;
//!     println!("tracking {job_id}");
//!
//!     // ... on teardown:
//!     tracker.shutdown();
//!     center.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! # Concurrency model
//!
//! Every loop is a Tokio task; suspension points are exactly the awaited
//! network calls. Within one job's loop, ticks are strictly sequential:
//! the loop re-arms only after the prior call settles. Across loops there
//! is no ordering guarantee. Stopping is cooperative via
//! [`stop::StopToken`]: a loop re-checks its token when it resumes from any
//! await, so a response that lands after cancellation is discarded.

pub mod api;
pub mod config;
pub mod jobs;
pub mod notifications;
pub mod observability;
pub mod session;
pub mod sink;
pub mod stop;
pub mod testing;

pub mod prelude {
    //! Convenience re-exports for common types and traits.
    //!
    //! ```rust
    //! use jobpulse::prelude::*;
    //! ```

    pub use crate::api::{
        ApiError, HttpClient, JobApi, JobState, JobStatus, JobUpload, NotificationApi,
        NotificationFilter, SubmitOptions,
    };
    pub use crate::config::Config;
    pub use crate::jobs::{JobRecord, JobTracker, TrackerError};
    pub use crate::notifications::{
        NotificationCenter, NotificationRecord, NotificationType, NotifyError,
    };
    pub use crate::sink::{Alert, AlertKind, AlertSink, TracingSink};
}
