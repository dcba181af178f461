//! Configuration.
//!
//! Settings load from multiple sources with clear precedence:
//!
//! 1. Environment variables (highest priority, `JOBPULSE_` prefix, `__` as
//!    the section separator, e.g. `JOBPULSE_JOBS__POLL_INTERVAL_MS=2000`)
//! 2. `./jobpulse.toml`
//! 3. Hardcoded defaults (fallback)
//!
//! # Example Configuration
//!
//! ```toml
//! # jobpulse.toml
//! [http]
//! base_url = "https://files.example.com/api"
//!
//! [jobs]
//! poll_interval_ms = 5000
//! backoff_cap_ms = 30000
//!
//! [notifications]
//! poll_interval_ms = 5000
//! idle_poll_every = 6
//! ```

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Job Tracking Engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSettings {
    /// Base status-poll cadence in milliseconds.
    pub poll_interval_ms: u64,

    /// Multiplier applied to the interval after a transport failure.
    pub backoff_factor: f64,

    /// Upper bound on the backed-off interval in milliseconds.
    pub backoff_cap_ms: u64,

    /// Grace period before a completed job is removed, in seconds.
    pub retire_after_secs: u64,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            backoff_factor: 1.5,
            backoff_cap_ms: 30_000,
            retire_after_secs: 30,
        }
    }
}

impl JobSettings {
    /// Base poll cadence.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Backoff ceiling.
    #[must_use]
    pub const fn backoff_cap(&self) -> Duration {
        Duration::from_millis(self.backoff_cap_ms)
    }

    /// Retirement grace period after completion.
    #[must_use]
    pub const fn retire_after(&self) -> Duration {
        Duration::from_secs(self.retire_after_secs)
    }
}

/// Notification Polling Engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Base tick cadence in milliseconds.
    pub poll_interval_ms: u64,

    /// While idle, poll only on every Nth tick (the first tick always
    /// polls). Bounds load when nothing is happening.
    pub idle_poll_every: u64,

    /// Maximum age, in seconds, for a notification to still be surfaced.
    pub freshness_window_secs: i64,

    /// Read notifications older than this many hours are pruned.
    pub prune_after_hours: i64,

    /// How many records the initial bootstrap fetch requests.
    pub initial_fetch_limit: u32,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            idle_poll_every: 6,
            freshness_window_secs: 60,
            prune_after_hours: 24,
            initial_fetch_limit: 50,
        }
    }
}

impl NotificationSettings {
    /// Base tick cadence.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Freshness window for surfacing notifications.
    #[must_use]
    pub fn freshness_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.freshness_window_secs)
    }

    /// Age past which read notifications are pruned.
    #[must_use]
    pub fn prune_age(&self) -> chrono::Duration {
        chrono::Duration::hours(self.prune_after_hours)
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Base URL of the job/notification API.
    pub base_url: String,

    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// Complete jobpulse configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Job Tracking Engine settings.
    pub jobs: JobSettings,

    /// Notification Polling Engine settings.
    pub notifications: NotificationSettings,

    /// HTTP client settings.
    pub http: HttpSettings,
}

impl Config {
    /// Load configuration from `./jobpulse.toml` and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a source exists but cannot be parsed.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from("jobpulse.toml")
    }

    /// Load configuration from a specific file and the environment.
    ///
    /// A missing file is not an error; defaults fill the gaps.
    ///
    /// # Errors
    ///
    /// Returns an error if a source exists but cannot be parsed.
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("JOBPULSE_").split("__"))
            .extract()?;
        Ok(config)
    }
}
