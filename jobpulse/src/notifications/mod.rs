//! The Notification Polling & Delivery Engine.
//!
//! An independently paced poller that fetches unread-notification counts
//! and payloads, merges them into a deduplicated in-memory store, and
//! forwards the fresh, presentable ones to the shared
//! [`AlertSink`](crate::sink::AlertSink). Each record is forwarded once, and never stale.

mod center;
mod error;
mod record;
mod store;

pub use center::NotificationCenter;
pub use error::NotifyError;
pub use record::{NotificationRecord, NotificationType};
pub use store::NotificationStore;
