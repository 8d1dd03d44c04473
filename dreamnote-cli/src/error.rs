//! Errors raised by the `dreamdtb` front-end.

use std::io;

use dreamnote_core::DreamError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] DreamError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The editor command could not be resolved or started.
    #[error("Editor error: {message}")]
    Editor { message: String },

    /// A required directory could not be determined.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn editor(message: impl Into<String>) -> Self {
        Self::Editor {
            message: message.into(),
        }
    }

    /// Message printed to the terminal when a command fails.
    pub fn user_message(&self) -> String {
        match self {
            Self::Core(e) => e.user_message(),
            Self::Io(e) => format!("File error: {e}"),
            Self::Json(e) => format!("Data format error: {e}"),
            Self::Editor { message } => message.clone(),
            Self::Config { message } => message.clone(),
        }
    }
}
