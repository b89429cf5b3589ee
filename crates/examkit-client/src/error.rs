//! Storage error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from a [`KeyValueStore`](crate::store::KeyValueStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file could not be read or written.
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing file exists but is not a JSON object of strings.
    #[error("corrupt session file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A stored value could not be encoded or decoded.
    #[error("invalid stored value for {key}: {source}")]
    Value {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
