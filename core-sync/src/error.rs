use bridge_traits::error::BridgeError;
use core_library::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Malformed image filename: {name}")]
    MalformedFilename { name: String },

    #[error("Document store unavailable: {0}")]
    DocumentStoreConnection(String),

    #[error("Document store error: {0}")]
    Store(#[from] LibraryError),

    #[error("Bulk write failed after {inserted} inserted and {modified} modified: {message}")]
    BulkWrite {
        inserted: u64,
        modified: u64,
        message: String,
    },

    #[error("Invalid sync target: {0}")]
    InvalidTarget(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
