//! Error types for logrotate

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::policy::Rotation;

/// Result type for rotating writer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or opening a rotating writer
#[derive(Debug, Error)]
pub enum Error {
    /// The rotation kind is declared but not implemented
    #[error("unsupported rotation type: {0}")]
    UnsupportedRotation(Rotation),

    /// The rotation value could not be recognized
    #[error("unknown rotation type: {0}")]
    UnknownRotation(String),

    /// Failed to create the directory holding the log file
    #[error("failed to create log directory {path}: {source}")]
    CreateDirectory {
        /// Directory that could not be created
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },

    /// Failed to open the log file for appending
    #[error("failed to open log file {path}: {source}")]
    Open {
        /// File that could not be opened
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },

    /// A global tracing subscriber could not be installed
    #[error("failed to install subscriber: {0}")]
    Subscriber(String),
}

impl Error {
    /// Whether this error comes from configuration rather than the filesystem
    pub fn is_config(&self) -> bool {
        matches!(self, Self::UnsupportedRotation(_) | Self::UnknownRotation(_))
    }
}
