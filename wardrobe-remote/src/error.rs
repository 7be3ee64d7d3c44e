//! Error types for wardrobe-remote.

use thiserror::Error;

/// Failure talking to the remote store, blob bucket or classifier.
///
/// The sync layer treats every variant as transient.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Connection, DNS, TLS or timeout failure before a response arrived.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("remote returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    /// The response body could not be decoded.
    #[error("failed to decode remote response: {0}")]
    Decode(String),

    /// The request succeeded but the payload was not usable.
    #[error("remote rejected request: {0}")]
    Rejected(String),

    /// The blocking worker running the request panicked or was cancelled.
    #[error("remote task failed: {0}")]
    Task(String),
}

impl From<ureq::Error> for RemoteError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, response) => RemoteError::Status {
                code,
                body: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(transport) => RemoteError::Transport(transport.to_string()),
        }
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::Decode(err.to_string())
    }
}
