//! CLI commands

mod jobs;
mod notifications;
mod submit;

pub use jobs::JobsCommand;
pub use notifications::NotificationsCommand;
pub use submit::SubmitCommand;

use console::{style, Emoji};
use jobpulse::sink::{Alert, AlertKind, AlertSink};

static SUCCESS: Emoji = Emoji("✓ ", "√ ");
static FAILURE: Emoji = Emoji("✗ ", "x ");
static INFO: Emoji = Emoji("ℹ ", "i ");

/// Renders engine alerts as styled terminal lines.
pub(crate) struct ConsoleSink;

impl AlertSink for ConsoleSink {
    fn alert(&self, alert: Alert) {
        match alert.kind {
            AlertKind::Success => {
                println!("{SUCCESS}{} {}", style(alert.title).green().bold(), alert.message);
            }
            AlertKind::Error => {
                eprintln!("{FAILURE}{} {}", style(alert.title).red().bold(), alert.message);
            }
            AlertKind::Warning => {
                println!("{} {}", style(alert.title).yellow().bold(), alert.message);
            }
            AlertKind::Info => {
                println!("{INFO}{} {}", style(alert.title).cyan(), alert.message);
            }
        }
    }
}
