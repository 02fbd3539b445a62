use thiserror::Error;

use crate::entry::EntryId;

/// Result type for spotlight operations.
pub type Result<T> = std::result::Result<T, SpotlightError>;

/// Errors that can occur in the placement scheduling system.
#[derive(Debug, Error)]
pub enum SpotlightError {
    /// Database operation failed
    #[cfg(feature = "postgres")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Entry not found
    #[error("Entry not found: {0}")]
    EntryNotFound(EntryId),

    /// An entry with the same id already exists
    #[error("Entry already exists: {0}")]
    DuplicateEntry(EntryId),

    /// Entry was in the wrong state for the attempted operation
    #[error("Invalid state for entry {0}: found {1}, expected {2}")]
    InvalidState(EntryId, String, String),

    /// Requested duration is outside the accepted range
    #[error("Duration out of range: {0} hours (allowed 1..=168)")]
    InvalidDuration(u32),

    /// Timestamp could not be parsed as ISO-8601
    #[error("Timestamp parse error: {0}")]
    Timestamp(#[from] chrono::ParseError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
