//! Job-tracking error types.

use crate::api::ApiError;
use thiserror::Error;

/// Errors surfaced by [`JobTracker`](crate::jobs::JobTracker) operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The job id is not in the registry.
    #[error("job {0} is not tracked")]
    UnknownJob(String),

    /// The remote API rejected the action or the transport failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}
