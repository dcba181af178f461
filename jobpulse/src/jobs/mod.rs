//! The Job Tracking Engine.
//!
//! Registers submitted jobs, polls each one's status on its own loop,
//! applies exponential backoff to transient polling failures, walks the
//! job through its lifecycle states, and retires completed records after a
//! grace period. Lifecycle transitions surface through the shared
//! [`AlertSink`](crate::sink::AlertSink).

mod error;
mod poller;
mod record;
mod tracker;

pub use error::TrackerError;
pub use record::{format_elapsed, JobRecord};
pub use tracker::JobTracker;
