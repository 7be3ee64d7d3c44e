//! `wardrobe remove <id>...`

use anyhow::Result;
use clap::Args;

use wardrobe_core::ItemId;

use super::{home, open_catalog, settle};

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// One or more item ids.
    #[arg(required = true)]
    pub ids: Vec<String>,
}

impl RemoveArgs {
    pub async fn run(self) -> Result<()> {
        let catalog = open_catalog(&home()?)?;
        let ids: Vec<ItemId> = self.ids.into_iter().map(ItemId::from).collect();

        let push = match ids.as_slice() {
            [single] => catalog.remove(single).await,
            many => catalog.remove_many(many).await,
        };
        settle(push).await?;

        println!("✓ removed {} item(s)", ids.len());
        Ok(())
    }
}
