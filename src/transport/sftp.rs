//! Secure (SFTP) transport variant
//!
//! Wraps `ssh2`'s blocking SFTP channel. The SFTP protocol has no notion
//! of a working directory, so this variant emulates one client-side: the
//! current directory is a field, `change_dir` validates targets with a
//! stat, and relative names are resolved against it before hitting the
//! wire.

use crate::transport::{to_wire_path, Transport};
use crate::types::{RemoteEntry, SyncError};
use chrono::{DateTime, Local};
use std::fs::File;
use std::io::{self, Read};
use std::net::TcpStream;
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};
use tracing::debug;

use ssh2::{ErrorCode, Session, Sftp};

// SFTP status codes surfaced as missing-path errors
// (LIBSSH2_FX_NO_SUCH_FILE / LIBSSH2_FX_NO_SUCH_PATH)
const FX_NO_SUCH_FILE: i32 = 2;
const FX_NO_SUCH_PATH: i32 = 10;

/// Transport over an SSH session's SFTP channel
pub struct SftpTransport {
    session: Session,
    sftp: Sftp,
    cwd: String,
    closed: bool,
}

impl SftpTransport {
    /// Open a TCP connection, handshake, authenticate and start SFTP
    pub fn connect(host: &str, port: u16, user: &str, password: &str) -> Result<Self, SyncError> {
        let tcp = TcpStream::connect((host, port))?;
        let mut session = Session::new().map_err(map_session_err)?;
        session.set_tcp_stream(tcp);
        session.handshake().map_err(map_session_err)?;
        session
            .userauth_password(user, password)
            .map_err(|err| SyncError::Auth(err.to_string()))?;
        let sftp = session.sftp().map_err(map_session_err)?;
        let cwd = sftp
            .realpath(Path::new("."))
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "/".to_string());
        Ok(Self {
            session,
            sftp,
            cwd,
            closed: false,
        })
    }

    /// Resolve a possibly-relative remote name against the emulated cwd
    fn resolve(&self, path: &str) -> String {
        let wire = to_wire_path(path);
        if wire.starts_with('/') {
            wire
        } else if self.cwd.ends_with('/') {
            format!("{}{}", self.cwd, wire)
        } else {
            format!("{}/{}", self.cwd, wire)
        }
    }
}

impl Transport for SftpTransport {
    fn current_dir(&mut self) -> Result<String, SyncError> {
        Ok(self.cwd.clone())
    }

    fn change_dir(&mut self, path: &str) -> Result<(), SyncError> {
        let target = self.resolve(path);
        let real = self
            .sftp
            .realpath(Path::new(&target))
            .map_err(|err| map_sftp_err(err, &target))?;
        let stat = self
            .sftp
            .stat(&real)
            .map_err(|err| map_sftp_err(err, &target))?;
        if !stat.is_dir() {
            return Err(SyncError::NotFound(target));
        }
        self.cwd = real.to_string_lossy().into_owned();
        Ok(())
    }

    fn list_entries(&mut self, newest_first: bool) -> Result<Vec<RemoteEntry>, SyncError> {
        let listing = self
            .sftp
            .readdir(Path::new(&self.cwd))
            .map_err(|err| map_sftp_err(err, &self.cwd))?;
        let mut entries = Vec::with_capacity(listing.len());
        for (path, stat) in listing {
            let name = match path.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => continue,
            };
            let is_dir = stat.is_dir();
            let size = stat.size.unwrap_or(0);
            let modified =
                DateTime::<Local>::from(UNIX_EPOCH + Duration::from_secs(stat.mtime.unwrap_or(0)));
            let raw_line = format!("{} {:>12} {}", if is_dir { "d" } else { "-" }, size, name);
            entries.push(RemoteEntry::new(raw_line, name, is_dir, size, modified));
        }
        if newest_first {
            entries.sort_by(|a, b| b.modified.cmp(&a.modified));
        }
        Ok(entries)
    }

    fn list_names(&mut self) -> Result<Vec<String>, SyncError> {
        Ok(self
            .list_entries(false)?
            .into_iter()
            .map(|entry| entry.name)
            .collect())
    }

    fn download_text(&mut self, remote: &str, local: &Path) -> Result<(), SyncError> {
        let remote_path = self.resolve(remote);
        let mut remote_file = self
            .sftp
            .open(Path::new(&remote_path))
            .map_err(|err| map_sftp_err(err, &remote_path))?;
        let mut text = String::new();
        remote_file.read_to_string(&mut text)?;
        std::fs::write(local, text.replace("\r\n", "\n"))?;
        Ok(())
    }

    fn download_binary(&mut self, remote: &str, local: &Path) -> Result<(), SyncError> {
        let remote_path = self.resolve(remote);
        let mut remote_file = self
            .sftp
            .open(Path::new(&remote_path))
            .map_err(|err| map_sftp_err(err, &remote_path))?;
        let mut local_file = File::create(local)?;
        io::copy(&mut remote_file, &mut local_file)?;
        Ok(())
    }

    fn upload_text(&mut self, local: &Path, remote: &str) -> Result<(), SyncError> {
        self.upload_binary(local, remote)
    }

    fn upload_binary(&mut self, local: &Path, remote: &str) -> Result<(), SyncError> {
        let remote_path = self.resolve(remote);
        let mut remote_file = self
            .sftp
            .create(Path::new(&remote_path))
            .map_err(|err| map_sftp_err(err, &remote_path))?;
        let mut local_file = File::open(local)?;
        io::copy(&mut local_file, &mut remote_file)?;
        Ok(())
    }

    fn delete(&mut self, remote: &str) -> Result<(), SyncError> {
        let remote_path = self.resolve(remote);
        self.sftp
            .unlink(Path::new(&remote_path))
            .map_err(|err| map_sftp_err(err, &remote_path))
    }

    fn close(&mut self) {
        if !self.closed {
            if let Err(err) = self.session.disconnect(None, "closing", None) {
                debug!(error = %err, "error closing sftp session");
            }
            self.closed = true;
        }
    }
}

/// Map an SFTP-level error into the crate taxonomy
fn map_sftp_err(err: ssh2::Error, path: &str) -> SyncError {
    match err.code() {
        ErrorCode::SFTP(FX_NO_SUCH_FILE) | ErrorCode::SFTP(FX_NO_SUCH_PATH) => {
            SyncError::NotFound(path.to_string())
        }
        _ => SyncError::Protocol(err.to_string()),
    }
}

/// Session-level failures (handshake, channel open) are protocol errors
fn map_session_err(err: ssh2::Error) -> SyncError {
    SyncError::Protocol(err.to_string())
}
