//! `wardrobe status`: cache and sync visibility.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;

use wardrobe_sync::{ReconcileStatus, SyncStatus};

use super::{home, open_local_catalog};

/// Arguments for `wardrobe status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub async fn run(self) -> Result<()> {
        let status = open_local_catalog(&home()?)?.status().await;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&status).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        print_summary(&status, Utc::now());
        Ok(())
    }
}

fn print_summary(status: &SyncStatus, now: DateTime<Utc>) {
    println!("Wardrobe v{}", env!("CARGO_PKG_VERSION"));
    if !status.local_available {
        println!("{} local cache unreadable", "■".red().bold());
        return;
    }

    println!("  cached items : {}", status.cached_items);
    println!("  last sync    : {}", last_sync_label(status.last_sync_at, now));
    if let Some(outcome) = status.last_outcome {
        let label = match outcome {
            ReconcileStatus::Synced => "online".green(),
            ReconcileStatus::Failed => "offline, showing cached data".yellow(),
            ReconcileStatus::InFlight | ReconcileStatus::RateLimited => "skipped".normal(),
        };
        match status.last_attempt_at {
            Some(at) => println!("  remote       : {label} ({})", age(at, now)),
            None => println!("  remote       : {label}"),
        }
    }
}

fn last_sync_label(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(at) = at else {
        return "never".to_string();
    };
    format!("{} ({})", at.format("%Y-%m-%d %H:%M UTC"), age(at, now))
}

fn age(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - at).num_seconds().max(0);
    match secs {
        0..=59 => format!("{secs}s ago"),
        60..=3_599 => format!("{}m ago", secs / 60),
        3_600..=86_399 => format!("{}h ago", secs / 3_600),
        _ => format!("{}d ago", secs / 86_400),
    }
}
