//! Notification feed commands.

use anyhow::Result;
use clap::Subcommand;
use console::style;
use jobpulse::api::{HttpClient, NotificationApi, NotificationFilter};
use jobpulse::config::Config;

/// Notification commands
#[derive(Debug, Subcommand)]
pub enum NotificationsCommand {
    /// List recent notifications
    List {
        /// Only show unread notifications
        #[arg(short, long)]
        unread: bool,

        /// Limit the number of results
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },

    /// Mark notifications read by id
    MarkRead {
        /// Notification ids to mark
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Mark every notification read
    MarkAllRead,
}

impl NotificationsCommand {
    /// Execute the notifications command.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the request or the transport
    /// fails.
    pub async fn execute(&self, config: &Config) -> Result<()> {
        let client = HttpClient::new(&config.http)?;

        match self {
            Self::List { unread, limit } => {
                let filter = NotificationFilter {
                    unread_only: *unread,
                    limit: Some(*limit),
                    offset: None,
                };
                let page = client.notifications(&filter).await?;

                println!(
                    "{} unread of {} total",
                    style(page.unread_count).bold(),
                    page.total_count
                );
                println!("{}", "─".repeat(72));

                for record in &page.notifications {
                    let marker = if record.is_read { " " } else { "*" };
                    println!(
                        "{marker} {:<14} {:<24} {}",
                        style(record.notification_type.name()).dim(),
                        style(&record.id).bold(),
                        record.title
                    );
                }
                if page.notifications.is_empty() {
                    println!("  {}", style("(no notifications)").dim());
                }
            }
            Self::MarkRead { ids } => {
                if let [id] = ids.as_slice() {
                    client.mark_read(id).await?;
                } else {
                    client.mark_many_read(ids).await?;
                }
                println!("marked {} read", ids.len());
            }
            Self::MarkAllRead => {
                client.mark_all_read().await?;
                println!("all notifications marked read");
            }
        }

        Ok(())
    }
}
