//! `wardrobe toggle <id>`

use anyhow::{bail, Result};
use clap::Args;

use wardrobe_core::{ItemFilter, ItemId};

use super::{home, open_catalog, settle};

#[derive(Args, Debug)]
pub struct ToggleArgs {
    /// Item id as shown by `wardrobe list`.
    pub id: String,
}

impl ToggleArgs {
    pub async fn run(self) -> Result<()> {
        let catalog = open_catalog(&home()?)?;
        let id = ItemId::from(self.id);

        let Some(push) = catalog.toggle(&id).await else {
            bail!("item '{id}' is not cached; run `wardrobe refresh` first");
        };
        let now_clean = catalog
            .items(&ItemFilter::default())
            .await
            .into_iter()
            .find(|item| item.id == id)
            .map(|item| item.is_clean);
        settle(push).await?;

        match now_clean {
            Some(true) => println!("✓ '{id}' marked clean"),
            Some(false) => println!("✓ '{id}' marked dirty"),
            None => println!("✓ '{id}' toggled"),
        }
        Ok(())
    }
}
