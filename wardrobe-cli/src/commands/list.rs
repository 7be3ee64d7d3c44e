//! `wardrobe list`: cached items, then the refreshed catalog.

use std::cell::RefCell;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use wardrobe_core::{AttributeValue, ItemFilter, ItemRecord, SortOrder, StatusFilter};

use super::{home, open_catalog, open_local_catalog};

/// Arguments for `wardrobe list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Read the local cache only; never contact the remote catalog.
    #[arg(long)]
    pub cached: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    /// Only items whose category matches (case-insensitive).
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// all | clean | dirty
    #[arg(long, short = 's', default_value_t = StatusFilter::All)]
    pub status: StatusFilter,

    /// Oldest items first.
    #[arg(long)]
    pub oldest: bool,
}

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "category")]
    category: String,
    #[tabled(rename = "color")]
    color: String,
    #[tabled(rename = "state")]
    state: String,
    #[tabled(rename = "added")]
    added: String,
}

impl ListArgs {
    pub async fn run(self) -> Result<()> {
        let home = home()?;
        let filter = ItemFilter {
            category: self.category.clone(),
            status: self.status,
            sort: if self.oldest {
                SortOrder::Oldest
            } else {
                SortOrder::Newest
            },
        };

        let items = if self.cached {
            open_local_catalog(&home)?.items(&filter).await
        } else {
            let catalog = open_catalog(&home)?;
            // Whichever set arrives last is the freshest.
            let latest = RefCell::new(Vec::new());
            let outcome = catalog
                .load(
                    |items| *latest.borrow_mut() = items,
                    |items| *latest.borrow_mut() = items,
                )
                .await;
            if !outcome.success() {
                eprintln!(
                    "{} remote catalog unavailable, showing cached items",
                    "!".yellow().bold()
                );
            }
            filter.apply(&latest.into_inner())
        };

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&items).context("failed to serialize items")?
            );
            return Ok(());
        }

        print_table(&items);
        Ok(())
    }
}

fn print_table(items: &[ItemRecord]) {
    if items.is_empty() {
        println!("No items.");
        return;
    }

    let clean = items.iter().filter(|i| i.is_clean).count();
    println!(
        "{} items | {} clean | {} dirty",
        items.len(),
        clean,
        items.len() - clean
    );

    let rows: Vec<ItemRow> = items
        .iter()
        .map(|item| ItemRow {
            id: item.id.0.clone(),
            category: item.category().unwrap_or("-").to_string(),
            color: item
                .attributes
                .get("color")
                .and_then(AttributeValue::as_text)
                .unwrap_or("-")
                .to_string(),
            state: if item.is_clean {
                "clean".green().to_string()
            } else {
                "dirty".yellow().to_string()
            },
            added: item.created_at.format("%Y-%m-%d").to_string(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
