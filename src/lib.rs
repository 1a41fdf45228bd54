//! # sitesync - Remote Site Mirroring Tool
//!
//! Mirrors a remote directory tree (plain FTP or secure SFTP) to the
//! local filesystem, skipping unchanged files and decrypting PGP
//! payloads after download.

// Module declarations
pub mod commands;
pub mod config;
pub mod pgp;
pub mod sync;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use config::{Config, GpgConfig, SiteConfig, SyncOptions};
pub use pgp::{Decryptor, GpgDecryptor};
pub use sync::SyncOutcome;
pub use transport::Transport;
pub use types::{RemoteEntry, SyncError, SyncStats};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
