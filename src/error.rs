//! Error taxonomy for the chatbot core.
//!
//! Embedding and index failures are fatal to the query that triggered them.
//! Completion failures carry the raw HTTP status and body so the caller can
//! surface them verbatim as that turn's reply. [`ClerkError::StreamDecode`]
//! is only ever logged: a malformed stream fragment is dropped and the
//! stream continues.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClerkError>;

#[derive(Debug, Error)]
pub enum ClerkError {
    /// The embedding model could not be loaded, rejected its input, or
    /// failed during inference.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// A vector index is missing, unreadable, or was never built.
    #[error("vector index unavailable: {0}")]
    IndexUnavailable(String),

    /// A vector does not match the index dimension.
    #[error("vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// The completion endpoint returned a non-success status.
    #[error("completion request failed with status {status}: {body}")]
    Completion { status: u16, body: String },

    /// A single malformed fragment in a streaming response. Recovered
    /// locally by skipping the fragment; never aborts the stream.
    #[error("malformed stream fragment: {0}")]
    StreamDecode(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Db(#[from] diesel::result::Error),
}

impl From<candle_core::Error> for ClerkError {
    fn from(err: candle_core::Error) -> Self {
        ClerkError::Embedding(err.to_string())
    }
}
