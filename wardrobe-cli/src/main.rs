//! Wardrobe: local-first catalog CLI.
//!
//! # Usage
//!
//! ```text
//! wardrobe list [--cached] [--json] [--category <C>] [--status all|clean|dirty] [--oldest]
//! wardrobe refresh
//! wardrobe toggle <id>
//! wardrobe edit <id> --set key=value... [--unset key...]
//! wardrobe remove <id>...
//! wardrobe add <image> [--set key=value...] [--dirty]
//! wardrobe suggest <intent>... [--json]
//! wardrobe status [--json]
//! wardrobe clear
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    add::AddArgs, clear::ClearArgs, edit::EditArgs, list::ListArgs, refresh::RefreshArgs,
    remove::RemoveArgs, status::StatusArgs, suggest::SuggestArgs, toggle::ToggleArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "wardrobe",
    version,
    about = "Browse and edit your wardrobe catalog, offline first",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List items: cached first, refreshed from the remote catalog.
    List(ListArgs),

    /// Pull the full remote catalog into the local cache.
    Refresh(RefreshArgs),

    /// Flip an item between clean and dirty.
    Toggle(ToggleArgs),

    /// Change an item's tags.
    Edit(EditArgs),

    /// Delete items and their photos.
    Remove(RemoveArgs),

    /// Upload a photo as a new item.
    Add(AddArgs),

    /// Suggest an outfit from clean items.
    Suggest(SuggestArgs),

    /// Show cache and sync state.
    Status(StatusArgs),

    /// Drop the local cache.
    Clear(ClearArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::List(args) => args.run().await,
        Commands::Refresh(args) => args.run().await,
        Commands::Toggle(args) => args.run().await,
        Commands::Edit(args) => args.run().await,
        Commands::Remove(args) => args.run().await,
        Commands::Add(args) => args.run().await,
        Commands::Suggest(args) => args.run().await,
        Commands::Status(args) => args.run().await,
        Commands::Clear(args) => args.run().await,
    }
}

/// Logs go to stderr so `--json` output stays parseable.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
