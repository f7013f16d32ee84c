//! Error types for the Notecase core library.

use thiserror::Error;

/// All errors that can occur within the Notecase core library.
#[derive(Debug, Error)]
pub enum NotecaseError {
    /// A SQLite operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A folder ID was requested that does not exist.
    #[error("Folder not found: {0}")]
    FolderNotFound(i64),

    /// A note ID was requested that does not exist.
    #[error("Note not found: {0}")]
    NoteNotFound(i64),

    /// A tag ID was requested that does not exist.
    #[error("Tag not found: {0}")]
    TagNotFound(i64),

    /// Input was rejected before any persistence attempt.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// A move would make a folder its own ancestor or targets a missing parent.
    #[error("Invalid move: {0}")]
    InvalidMove(String),

    /// A requested sibling position lies outside `[0, max]`.
    #[error("Invalid position {position}: must be between 0 and {max}")]
    InvalidPosition { position: i64, max: usize },

    /// The persistence backend rejected a mutation; local state was rolled back.
    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    /// The opened file is not a valid Notecase database.
    #[error("Invalid database: {0}")]
    InvalidDatabase(String),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Data could not be (de)serialised as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias that pins the error type to [`NotecaseError`].
pub type Result<T> = std::result::Result<T, NotecaseError>;

impl NotecaseError {
    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(e) => format!("Failed to save: {e}"),
            Self::FolderNotFound(_) => "Folder no longer exists".to_string(),
            Self::NoteNotFound(_) => "Note no longer exists".to_string(),
            Self::TagNotFound(_) => "Tag no longer exists".to_string(),
            Self::ValidationFailed(msg) => msg.clone(),
            Self::InvalidMove(msg) => msg.clone(),
            Self::InvalidPosition { .. } => "That position is not available".to_string(),
            Self::PersistenceFailed(msg) => format!("Changes were not saved: {msg}"),
            Self::InvalidDatabase(_) => "Could not open notes database".to_string(),
            Self::Io(e) => format!("File error: {e}"),
            Self::Json(e) => format!("Data format error: {e}"),
        }
    }

    /// `true` for errors raised before any backend call was attempted.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationFailed(_) | Self::InvalidMove(_) | Self::InvalidPosition { .. }
        )
    }
}
