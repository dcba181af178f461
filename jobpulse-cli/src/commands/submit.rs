//! Submit a file and watch the job to completion.

use super::ConsoleSink;
use anyhow::{bail, Context, Result};
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use jobpulse::api::{HttpClient, JobState, JobUpload, SubmitOptions};
use jobpulse::config::Config;
use jobpulse::jobs::JobTracker;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Submit a file for processing
#[derive(Debug, Args)]
pub struct SubmitCommand {
    /// File to process
    pub file: PathBuf,

    /// Execution priority (higher = more important)
    #[arg(short, long)]
    pub priority: Option<i32>,

    /// Webhook the server calls when the job finishes
    #[arg(long)]
    pub webhook_url: Option<String>,

    /// Print the job id and return instead of watching
    #[arg(long)]
    pub no_watch: bool,
}

impl SubmitCommand {
    /// Execute the submit command.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the submission is
    /// rejected, or the job ends in a non-success state while watching.
    pub async fn execute(&self, config: &Config) -> Result<()> {
        let bytes = tokio::fs::read(&self.file)
            .await
            .with_context(|| format!("failed to read {}", self.file.display()))?;
        let filename = self
            .file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload.bin")
            .to_string();

        let client = Arc::new(HttpClient::new(&config.http)?);
        let tracker = JobTracker::new(client, Arc::new(ConsoleSink), config.jobs.clone());

        let options = SubmitOptions {
            priority: self.priority,
            webhook_url: self.webhook_url.clone(),
        };
        let job_id = tracker.submit(JobUpload::new(filename, bytes), options).await?;

        if self.no_watch {
            println!("{}", style(&job_id).bold());
            tracker.shutdown();
            return Ok(());
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
        spinner.enable_steady_tick(Duration::from_millis(120));

        let outcome = loop {
            let Some(record) = tracker.job(&job_id) else {
                break None;
            };
            match record.state() {
                Some(state) if state.is_terminal() => break Some(state),
                Some(state) => {
                    let progress = record
                        .status
                        .as_ref()
                        .and_then(|status| status.progress)
                        .map(|percent| format!(" {percent}%"))
                        .unwrap_or_default();
                    spinner.set_message(format!(
                        "{state}{progress} ({})",
                        tracker.job_duration(&job_id)
                    ));
                }
                None => spinner.set_message("waiting for first status"),
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        };
        spinner.finish_and_clear();

        let duration = tracker.job_duration(&job_id);
        tracker.shutdown();

        match outcome {
            Some(JobState::Completed) => {
                println!("{} in {duration}", style("completed").green().bold());
                Ok(())
            }
            Some(JobState::Failed) => bail!("job {job_id} failed after {duration}"),
            Some(JobState::Cancelled) => bail!("job {job_id} was cancelled"),
            Some(state) => bail!("job {job_id} stopped in unexpected state {state}"),
            None => bail!("job {job_id} is no longer tracked"),
        }
    }
}
