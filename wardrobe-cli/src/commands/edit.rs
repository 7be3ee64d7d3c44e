//! `wardrobe edit <id> --set key=value... [--unset key...]`

use anyhow::{bail, Result};
use clap::Args;

use wardrobe_core::{ItemFilter, ItemId};

use super::{home, open_catalog, parse_sets, settle};

#[derive(Args, Debug)]
pub struct EditArgs {
    pub id: String,

    /// Tag to add or overwrite, e.g. `--set color=navy`. Repeatable.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Tag to drop. Repeatable.
    #[arg(long = "unset", value_name = "KEY")]
    pub unset: Vec<String>,
}

impl EditArgs {
    pub async fn run(self) -> Result<()> {
        if self.set.is_empty() && self.unset.is_empty() {
            bail!("nothing to change; pass --set key=value or --unset key");
        }
        let changes = parse_sets(&self.set)?;

        let catalog = open_catalog(&home()?)?;
        let id = ItemId::from(self.id);
        let Some(current) = catalog
            .items(&ItemFilter::default())
            .await
            .into_iter()
            .find(|item| item.id == id)
        else {
            bail!("item '{id}' is not cached; run `wardrobe refresh` first");
        };

        let mut attributes = current.attributes;
        for key in &self.unset {
            attributes.remove(key);
        }
        attributes.extend(changes);

        let Some(push) = catalog.edit(&id, attributes).await else {
            bail!("item '{id}' disappeared from the cache");
        };
        settle(push).await?;
        println!("✓ '{id}' updated");
        Ok(())
    }
}
