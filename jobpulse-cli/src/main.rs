//! jobpulse operator CLI
//!
//! Drives the jobpulse engines against a live API the way the surrounding
//! application would: submit a file and watch it to completion, act on
//! individual jobs, and inspect the notification feed.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{JobsCommand, NotificationsCommand, SubmitCommand};
use jobpulse::config::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "jobpulse")]
#[command(version)]
#[command(about = "Track server-executed jobs and their notifications", long_about = None)]
struct Cli {
    /// Path to a config file (defaults to ./jobpulse.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a file for processing and watch it to completion
    Submit(SubmitCommand),
    /// Inspect or act on individual jobs
    Jobs {
        #[command(subcommand)]
        command: JobsCommand,
    },
    /// List or mark notifications
    Notifications {
        #[command(subcommand)]
        command: NotificationsCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    jobpulse::observability::init()?;
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(base_url) = cli.base_url {
        config.http.base_url = base_url;
    }

    match cli.command {
        Commands::Submit(command) => command.execute(&config).await,
        Commands::Jobs { command } => command.execute(&config).await,
        Commands::Notifications { command } => command.execute(&config).await,
    }
}
