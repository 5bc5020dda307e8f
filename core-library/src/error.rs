use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Could not connect to document store: {0}")]
    Connection(String),

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("Bulk write failed after {inserted} inserted and {modified} modified: {message}")]
    BulkWrite {
        inserted: u64,
        modified: u64,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, LibraryError>;
