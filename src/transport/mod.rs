//! Transport abstraction over the two supported wire protocols
//!
//! The sync engine is agnostic to which protocol is active: both the plain
//! FTP and the secure SFTP variants implement the same blocking [`Transport`]
//! trait, and [`connect`] picks the variant from the site configuration.

pub mod ftp;
pub mod parser;
pub mod sftp;

use crate::config::SyncOptions;
use crate::types::{RemoteEntry, SyncError};
use std::path::Path;
use std::time::Duration;
use tracing::error;

pub use ftp::FtpTransport;
pub use parser::EntryParser;
pub use sftp::SftpTransport;

/// Maximum connection attempts before giving up
pub const CONNECT_ATTEMPTS: u32 = 10;

/// Fixed wait between connection attempts
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Blocking session with a remote file-transfer server
///
/// Session state is limited to the current remote working directory. Any
/// caller that changes it must restore the prior value before returning
/// control to a parent frame (see the sync engine's acquire/restore
/// discipline).
pub trait Transport {
    /// Return the current remote working directory
    fn current_dir(&mut self) -> Result<String, SyncError>;

    /// Change the remote working directory
    ///
    /// Fails with [`SyncError::NotFound`] if the path does not exist.
    /// Path separators are normalized to forward slashes before hitting
    /// the wire, regardless of the caller's local convention.
    fn change_dir(&mut self, path: &str) -> Result<(), SyncError>;

    /// List the current directory as structured entries
    ///
    /// Lines that fail to parse are dropped (with a warning), not raised.
    /// With `newest_first` the result is sorted descending by modification
    /// time; the order among equal timestamps is unspecified.
    fn list_entries(&mut self, newest_first: bool) -> Result<Vec<RemoteEntry>, SyncError>;

    /// List the current directory as bare names (existence checks)
    fn list_names(&mut self) -> Result<Vec<String>, SyncError>;

    /// Download a remote file in text mode (line endings may be normalized)
    fn download_text(&mut self, remote: &str, local: &Path) -> Result<(), SyncError>;

    /// Download a remote file in binary mode (byte content untouched)
    fn download_binary(&mut self, remote: &str, local: &Path) -> Result<(), SyncError>;

    /// Upload a local file in text mode
    fn upload_text(&mut self, local: &Path, remote: &str) -> Result<(), SyncError>;

    /// Upload a local file in binary mode
    fn upload_binary(&mut self, local: &Path, remote: &str) -> Result<(), SyncError>;

    /// Delete a remote file
    ///
    /// Fails with [`SyncError::NotFound`] if the file does not exist.
    fn delete(&mut self, remote: &str) -> Result<(), SyncError>;

    /// Close the session; idempotent and best-effort (errors suppressed)
    fn close(&mut self);
}

/// Normalize a path to the wire convention (forward slashes)
pub fn to_wire_path(path: &str) -> String {
    path.replace(std::path::MAIN_SEPARATOR, "/")
}

/// Connect to the site described by `options`
///
/// Selects the secure or plain transport variant, retrying transient
/// connection failures with a fixed backoff. Authentication failures are
/// terminal. Returns None when no connection could be established; the
/// caller must treat that as "sync aborted, nothing to report".
///
/// On success the transport is navigated to the configured starting
/// directory; if that navigation fails the half-open connection is closed
/// before returning None.
pub fn connect(options: &SyncOptions) -> Option<Box<dyn Transport>> {
    let mut cn = connect_with_retry(CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY, || {
        open_transport(options)
    })?;
    if !options.remote_dir.is_empty() {
        if let Err(err) = cn.change_dir(&options.remote_dir) {
            error!(
                dir = %options.remote_dir,
                error = %err,
                "could not enter remote starting directory"
            );
            cn.close();
            return None;
        }
    }
    Some(cn)
}

fn open_transport(options: &SyncOptions) -> Result<Box<dyn Transport>, SyncError> {
    if options.secure {
        let port = options.port.unwrap_or(22);
        Ok(Box::new(SftpTransport::connect(
            &options.hostname,
            port,
            &options.username,
            &options.password,
        )?))
    } else {
        let port = options.port.unwrap_or(21);
        Ok(Box::new(FtpTransport::connect(
            &options.hostname,
            port,
            &options.username,
            &options.password,
        )?))
    }
}

/// Retry loop shared by [`connect`], factored out so the bound and backoff
/// behavior can be exercised without a live server
///
/// Transient errors sleep `delay` and retry up to `max_attempts` times;
/// an authentication error returns None immediately.
pub fn connect_with_retry<T, F>(max_attempts: u32, delay: Duration, mut open: F) -> Option<T>
where
    F: FnMut() -> Result<T, SyncError>,
{
    for attempt in 1..=max_attempts {
        match open() {
            Ok(cn) => return Some(cn),
            Err(err) if err.is_auth() => {
                error!(error = %err, "authentication rejected, not retrying");
                return None;
            }
            Err(err) => {
                error!(error = %err, attempt, max_attempts, "connection attempt failed");
                if attempt < max_attempts {
                    std::thread::sleep(delay);
                }
            }
        }
    }
    None
}
