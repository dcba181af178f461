//! Job inspection and control commands.

use anyhow::Result;
use clap::Subcommand;
use console::style;
use jobpulse::api::{HttpClient, JobApi};
use jobpulse::config::Config;

/// Job management commands
#[derive(Debug, Subcommand)]
pub enum JobsCommand {
    /// Show the server-side status of a job
    Status {
        /// Job id to query
        job_id: String,
    },

    /// Cancel a running job
    Cancel {
        /// Job id to cancel
        job_id: String,
    },

    /// Retry a failed job
    Retry {
        /// Job id to retry
        job_id: String,
    },
}

impl JobsCommand {
    /// Execute the jobs command.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the request or the transport
    /// fails.
    pub async fn execute(&self, config: &Config) -> Result<()> {
        let client = HttpClient::new(&config.http)?;

        match self {
            Self::Status { job_id } => {
                let status = client.get_status(job_id).await?;
                println!("{:<12} {}", "id", style(&status.id).bold());
                println!("{:<12} {}", "status", status.state);
                println!("{:<12} {}", "file", status.filename);
                if let Some(progress) = status.progress {
                    println!("{:<12} {progress}%", "progress");
                }
                if let Some(completed_at) = status.completed_at {
                    println!("{:<12} {completed_at}", "completed");
                }
                if let Some(message) = &status.error_message {
                    println!("{:<12} {}", "error", style(message).red());
                }
            }
            Self::Cancel { job_id } => {
                client.cancel(job_id).await?;
                println!("{} cancelled", style(job_id).bold());
            }
            Self::Retry { job_id } => {
                client.retry(job_id).await?;
                println!("{} queued again", style(job_id).bold());
            }
        }

        Ok(())
    }
}
