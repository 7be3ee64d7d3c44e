//! `wardrobe add <image> [--set key=value...] [--dirty]`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use wardrobe_core::ItemDraft;

use super::{home, open_catalog, parse_sets};

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Photo of the item (jpg, png, webp, heic).
    pub image: PathBuf,

    /// Tag that overrides the classifier's guess. Repeatable.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Record the item as dirty.
    #[arg(long)]
    pub dirty: bool,
}

impl AddArgs {
    pub async fn run(self) -> Result<()> {
        let attributes = parse_sets(&self.set)?;
        let bytes = std::fs::read(&self.image)
            .with_context(|| format!("cannot read '{}'", self.image.display()))?;

        let catalog = open_catalog(&home()?)?;
        let draft = ItemDraft {
            attributes,
            is_clean: !self.dirty,
            content_type: content_type_for(&self.image).to_string(),
        };
        let item = catalog
            .create(draft, bytes)
            .await
            .with_context(|| format!("failed to add '{}'", self.image.display()))?;

        println!(
            "✓ added '{}' ({})",
            item.id,
            item.category().unwrap_or("uncategorised")
        );
        Ok(())
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("heic") | Some("heif") => "image/heic",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}
