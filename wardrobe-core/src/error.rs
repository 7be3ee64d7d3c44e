//! Error types for wardrobe-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the on-device replica.
///
/// Callers above the replica treat every variant as "local storage
/// unavailable": they log it and fall back to remote data.
#[derive(Debug, Error)]
pub enum ReplicaError {
    /// I/O failure, with the path that was being read or written.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The replica document could not be encoded.
    #[error("replica JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document was written by a newer build than this one understands.
    #[error("replica at {path} has schema version {found}, newest supported is {supported}")]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        supported: u32,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Errors raised while loading `config.yaml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error, with the file that failed.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Neither a config file nor environment overrides were found.
    #[error("no configuration at {path}; create it or set WARDROBE_REMOTE_URL and WARDROBE_REMOTE_KEY")]
    NotFound { path: PathBuf },

    /// A required field is absent after merging file and environment.
    #[error("missing configuration value: {0}")]
    Missing(&'static str),

    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Convenience constructor for [`ReplicaError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ReplicaError {
    ReplicaError::Io {
        path: path.into(),
        source,
    }
}
