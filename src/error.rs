use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the history mirror. Which variants abort a run and
/// which are absorbed into a per-unit report is decided by the caller.
#[derive(Debug, Error)]
pub enum HistError {
    #[error("failed to fetch totals index: {0}")]
    RemoteIndex(String),

    #[error("failed to prepare storage root {path}: {source}")]
    StorageRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid partition key {0:?}")]
    InvalidKey(String),

    #[error("request for {key} failed: {cause}")]
    Fetch { key: String, cause: String },

    #[error("non happy status for {key}: {status}")]
    Status { key: String, status: u16 },

    #[error("failed to write shard {key}: {source}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to post id {id}: {cause}")]
    Dispatch { id: i32, cause: String },

    #[error("error decoding shard {path}: {cause}")]
    CorruptShard { path: PathBuf, cause: String },
}
