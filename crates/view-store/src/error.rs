use thiserror::Error;

use crate::ViewEventId;

/// Errors that can occur when interacting with the view store.
#[derive(Debug, Error)]
pub enum ViewStoreError {
    /// An event with the same ID has already been stored.
    #[error("Duplicate view event: {0}")]
    DuplicateEvent(ViewEventId),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for view store operations.
pub type Result<T> = std::result::Result<T, ViewStoreError>;
