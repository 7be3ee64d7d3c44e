//! `wardrobe suggest <intent>`: pick an outfit from clean cached items.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use wardrobe_core::AttributeValue;
use wardrobe_sync::Outfit;

use super::{home, open_local_catalog};

#[derive(Args, Debug)]
pub struct SuggestArgs {
    /// What the outfit is for, e.g. "rainy office day".
    #[arg(required = true, num_args = 1..)]
    pub intent: Vec<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl SuggestArgs {
    pub async fn run(self) -> Result<()> {
        let intent = self.intent.join(" ");
        let outfit = open_local_catalog(&home()?)?.suggest(&intent).await;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&outfit).context("failed to serialize outfit")?
            );
            return Ok(());
        }

        print_outfit(&outfit);
        Ok(())
    }
}

fn print_outfit(outfit: &Outfit) {
    if outfit.items.is_empty() {
        println!("{} no outfit: {}", "!".yellow().bold(), outfit.reasoning);
        return;
    }

    match &outfit.outfit_type {
        Some(kind) => println!("{} ({kind})", "Outfit".bold()),
        None => println!("{}", "Outfit".bold()),
    }
    for item in &outfit.items {
        let color = item
            .attributes
            .get("color")
            .and_then(AttributeValue::as_text)
            .unwrap_or("-");
        println!(
            "  {} {} [{color}]",
            item.id.0,
            item.category().unwrap_or("-")
        );
    }
    if !outfit.reasoning.is_empty() {
        println!("\n{}", outfit.reasoning);
    }
}
