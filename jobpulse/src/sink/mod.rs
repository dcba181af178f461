//! The presentation channel.
//!
//! Both engines report user-facing events through an [`AlertSink`]; the
//! surrounding application decides what a sink call turns into (a toast, a
//! status line, a log entry). Engines share the sink but nothing else.

use std::time::Duration;
use tracing::{error, info, warn};

/// Presentation category of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    /// A server-confirmed success (job completed).
    Success,
    /// A server-confirmed failure or rejected action.
    Error,
    /// A cautionary event (job cancelled, retry scheduled).
    Warning,
    /// Informational (upload started).
    Info,
}

impl AlertKind {
    /// Display name of the kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// A single user-facing alert.
#[derive(Debug, Clone)]
pub struct Alert {
    /// Presentation category.
    pub kind: AlertKind,
    /// Short headline.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Whether the alert should survive automatic dismissal.
    pub persistent: bool,
    /// Auto-dismiss delay for non-persistent alerts; `None` leaves the
    /// choice to the presentation layer.
    pub duration: Option<Duration>,
}

impl Alert {
    /// Create an alert of the given kind.
    #[must_use]
    pub fn new(kind: AlertKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            persistent: false,
            duration: None,
        }
    }

    /// A success alert.
    #[must_use]
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(AlertKind::Success, title, message)
    }

    /// An error alert.
    #[must_use]
    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(AlertKind::Error, title, message)
    }

    /// A warning alert.
    #[must_use]
    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(AlertKind::Warning, title, message)
    }

    /// An info alert.
    #[must_use]
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(AlertKind::Info, title, message)
    }

    /// Mark the alert as surviving automatic dismissal.
    #[must_use]
    pub const fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    /// Set the auto-dismiss delay.
    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// A presentation channel for engine events.
///
/// Implementations must be cheap and non-blocking: sinks are called from
/// inside poll loops, and a slow sink delays the loop's next tick.
pub trait AlertSink: Send + Sync {
    /// Deliver one alert.
    fn alert(&self, alert: Alert);
}

/// Default sink that routes alerts into the `tracing` log stream.
///
/// Useful for headless consumers and as a fallback before a real
/// presentation layer is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl AlertSink for TracingSink {
    fn alert(&self, alert: Alert) {
        match alert.kind {
            AlertKind::Success | AlertKind::Info => {
                info!(title = %alert.title, "{}", alert.message);
            }
            AlertKind::Warning => {
                warn!(title = %alert.title, "{}", alert.message);
            }
            AlertKind::Error => {
                error!(title = %alert.title, "{}", alert.message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let alert = Alert::success("Done", "report.pdf finished in 3s")
            .with_duration(Duration::from_millis(5_000));

        assert_eq!(alert.kind, AlertKind::Success);
        assert!(!alert.persistent);
        assert_eq!(alert.duration, Some(Duration::from_millis(5_000)));

        let alert = Alert::error("Failed", "boom").persistent();
        assert!(alert.persistent);
        assert!(alert.duration.is_none());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(AlertKind::Success.name(), "success");
        assert_eq!(AlertKind::Error.name(), "error");
        assert_eq!(AlertKind::Warning.name(), "warning");
        assert_eq!(AlertKind::Info.name(), "info");
    }
}
