//! Error types for the Dream Note core library.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// All errors that can occur within the Dream Note core library.
#[derive(Debug, Error)]
pub enum DreamError {
    /// A SQLite operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A note with the same title already exists on that date.
    #[error("Duplicate note: '{title}' on {date}")]
    Duplicate { title: String, date: NaiveDate },

    /// A note ID was requested that does not exist in the database.
    #[error("Note not found: {0}")]
    NotFound(i64),

    /// A note draft or change set failed validation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A working-copy handle is not tracked by the buffer tracker.
    #[error("Unknown buffer: {}", .0.display())]
    UnknownBuffer(PathBuf),

    /// Closing the buffer would discard edits that were never saved.
    #[error("Buffer has unsaved changes: {}", .0.display())]
    UnsavedChanges(PathBuf),

    /// The editor bridge is unavailable or sent something unusable.
    #[error("Editor bridge error: {0}")]
    Transport(String),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A bridge message could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias that pins the error type to [`DreamError`].
pub type Result<T> = std::result::Result<T, DreamError>;

impl DreamError {
    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(e) => format!("Failed to save: {e}"),
            Self::Duplicate { title, date } => {
                format!("A dream titled '{title}' already exists on {date}")
            }
            Self::NotFound(id) => format!("Dream {id} no longer exists"),
            Self::Validation(msg) => msg.clone(),
            Self::UnknownBuffer(path) => format!("No open buffer for {}", path.display()),
            Self::UnsavedChanges(path) => {
                format!("{} has unsaved changes", path.display())
            }
            Self::Transport(msg) => format!("Editor connection problem: {msg}"),
            Self::Io(e) => format!("File error: {e}"),
            Self::Json(e) => format!("Data format error: {e}"),
        }
    }

    /// True when the error only means a uniqueness constraint rejected the write.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

/// Returns true when `err` is a SQLite constraint violation.
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
