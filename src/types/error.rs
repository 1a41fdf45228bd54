//! Error types for sitesync

use thiserror::Error;

/// Error types for sitesync operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// Standard IO error (automatically converted via #[from])
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The remote end rejected our credentials
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A remote path does not exist (change-directory, delete, get)
    #[error("Remote path not found: {0}")]
    NotFound(String),

    /// Any other wire-protocol level failure
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Decryption of a downloaded payload failed
    #[error("Decryption failed for {file}: {detail}")]
    Decrypt { file: String, detail: String },
}

impl SyncError {
    /// Check if this error is an authentication failure (never retried)
    pub fn is_auth(&self) -> bool {
        matches!(self, SyncError::Auth(_))
    }

    /// Check if this error is a missing remote path
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound(_))
    }

    /// Check if this error is worth retrying at connect time
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Io(_) | SyncError::Protocol(_))
    }
}
