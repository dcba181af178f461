//! Notification-engine error types.

use crate::api::ApiError;
use thiserror::Error;

/// Errors surfaced by [`NotificationCenter`](crate::notifications::NotificationCenter)
/// operations.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The remote API rejected the action or the transport failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}
