//! `wardrobe clear`

use anyhow::{bail, Result};
use clap::Args;

use super::{home, open_local_catalog};

#[derive(Args, Debug)]
pub struct ClearArgs {}

impl ClearArgs {
    pub async fn run(self) -> Result<()> {
        if !open_local_catalog(&home()?)?.clear_cache().await {
            bail!("failed to clear the local cache");
        }
        println!("✓ local cache cleared");
        Ok(())
    }
}
