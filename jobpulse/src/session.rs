//! Process-wide client session identity.

use once_cell::sync::Lazy;
use uuid::Uuid;

static SESSION_ID: Lazy<String> = Lazy::new(|| Uuid::new_v4().to_string());

/// The session id for this process.
///
/// Generated once per process lifetime and attached to every job
/// submission so the server can correlate jobs and notifications that
/// originate from the same client instance. Never persisted; a restart is
/// a new session.
#[must_use]
pub fn id() -> &'static str {
    &SESSION_ID
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_is_stable() {
        assert_eq!(id(), id());
        assert!(Uuid::parse_str(id()).is_ok());
    }
}
