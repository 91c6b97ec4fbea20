//! Error types for sesh_core operations.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for sesh_core operations.
#[derive(Error, Debug)]
pub enum SeshError {
    /// Alias name was empty.
    #[error("alias name cannot be empty")]
    EmptyAliasName,

    /// Alias name contains characters outside `[A-Za-z0-9_-]`.
    #[error("alias name '{0}' must contain only letters, numbers, dashes, and underscores")]
    InvalidAliasName(String),

    /// Alias name collides with a reserved word.
    #[error("'{0}' is a reserved alias name")]
    ReservedAliasName(String),

    /// Alias does not exist in the index.
    #[error("alias '{0}' not found")]
    AliasNotFound(String),

    /// Target alias name is already taken.
    #[error("alias '{0}' already exists")]
    AliasExists(String),

    /// The alias index could not be written.
    #[error("failed to {0}: alias index could not be saved")]
    PersistFailed(&'static str),

    /// No session matches the given alias or id.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Session short id would not stay inside the sessions directory.
    #[error("invalid session id '{0}': must be a single file name component")]
    InvalidShortId(String),

    /// A session file could not be created or updated.
    #[error("failed to record session at {}: {}", path.display(), reason)]
    RecordFailed {
        /// Path of the session file
        path: PathBuf,
        /// Description of what went wrong
        reason: String,
    },

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error while encoding the alias index.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error (loading, parsing, invalid values).
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl SeshError {
    /// Returns true for errors caused by a bad name rather than by storage.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyAliasName
                | Self::InvalidAliasName(_)
                | Self::ReservedAliasName(_)
                | Self::AliasExists(_)
                | Self::InvalidShortId(_)
        )
    }

    /// Returns a user-friendly recovery suggestion for the error, if available.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::ReservedAliasName(_) => {
                Some("Pick another name; list, help, remove, delete, create and set are reserved.")
            }
            Self::AliasExists(_) => {
                Some("Remove the existing alias with 'sesh alias rm <name>' or choose another name.")
            }
            Self::AliasNotFound(_) => Some("Run 'sesh alias list' to see the available aliases."),
            Self::SessionNotFound(_) => Some("Run 'sesh list' to see the available sessions."),
            Self::PersistFailed(_) => Some(
                "Check permissions on the alias file and the directory holding it.",
            ),
            Self::InvalidShortId(_) => {
                Some("Use a session id without path separators, such as the project name.")
            }
            Self::ConfigError(_) => Some("Fix or remove sesh.toml in the content root."),
            _ => None,
        }
    }
}

/// Convenience Result type for sesh_core operations.
pub type Result<T> = std::result::Result<T, SeshError>;
