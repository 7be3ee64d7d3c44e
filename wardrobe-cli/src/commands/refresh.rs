//! `wardrobe refresh`: pull the remote catalog into the cache.

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;

use wardrobe_sync::ReconcileStatus;

use super::{home, open_catalog};

#[derive(Args, Debug)]
pub struct RefreshArgs {}

impl RefreshArgs {
    pub async fn run(self) -> Result<()> {
        let catalog = open_catalog(&home()?)?;
        let outcome = catalog.refresh_now().await;
        match outcome.status {
            ReconcileStatus::Synced => {
                println!("{} synced {} items", "✓".green(), outcome.items.len());
                Ok(())
            }
            ReconcileStatus::InFlight | ReconcileStatus::RateLimited => {
                println!("· refresh skipped, {} cached items", outcome.items.len());
                Ok(())
            }
            ReconcileStatus::Failed => bail!(
                "remote catalog unavailable; {} cached items kept",
                outcome.items.len()
            ),
        }
    }
}
