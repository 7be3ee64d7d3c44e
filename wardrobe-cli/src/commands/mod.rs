//! Subcommands and the plumbing they share.

pub mod add;
pub mod clear;
pub mod edit;
pub mod list;
pub mod refresh;
pub mod remove;
pub mod status;
pub mod suggest;
pub mod toggle;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};

use wardrobe_core::{config, types::parse_attribute, Attributes, ConfigError, LocalReplicaStore};
use wardrobe_sync::{Catalog, Push};

pub(crate) fn home() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

/// Catalog wired to the configured remote store.
pub(crate) fn open_catalog(home: &Path) -> Result<Catalog> {
    let config = config::load_at(home).with_context(|| {
        format!(
            "no remote configured: create {} or set {} and {}",
            config::config_path_at(home).display(),
            config::ENV_REMOTE_URL,
            config::ENV_REMOTE_KEY,
        )
    })?;
    Ok(Catalog::from_config(&config, replica(home)))
}

/// Catalog for commands that only touch the local cache. Works without a
/// config file; a broken one is still an error.
pub(crate) fn open_local_catalog(home: &Path) -> Result<Catalog> {
    let config = match config::load_at(home) {
        Ok(config) => config,
        Err(ConfigError::NotFound { .. }) => Default::default(),
        Err(err) => return Err(err).context("failed to load wardrobe config"),
    };
    Ok(Catalog::from_config(&config, replica(home)))
}

fn replica(home: &Path) -> Arc<LocalReplicaStore> {
    Arc::new(LocalReplicaStore::open_at(home))
}

/// Wait for a background push before the process exits.
pub(crate) async fn settle(push: Push) -> Result<()> {
    push.await.context("remote push task failed")
}

/// Parse repeated `--set key=value` flags.
pub(crate) fn parse_sets(pairs: &[String]) -> Result<Attributes> {
    pairs
        .iter()
        .map(|pair| {
            parse_attribute(pair).ok_or_else(|| anyhow!("expected key=value, got '{pair}'"))
        })
        .collect()
}
