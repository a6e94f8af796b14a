//! View counter error types.

use thiserror::Error;
use view_store::ViewStoreError;

/// Errors that can occur while recording or counting views.
#[derive(Debug, Error)]
pub enum ViewCounterError {
    /// The backing store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] ViewStoreError),

    /// A date token has no mapping and is not a timestamp either.
    #[error("Unresolved date token: '{0}'")]
    UnresolvedDateToken(String),

    /// A relative date falls outside the representable range of timestamps.
    #[error("Date out of range: '{0}'")]
    DateOutOfRange(String),
}

/// Result type for view counter operations.
pub type Result<T> = std::result::Result<T, ViewCounterError>;
