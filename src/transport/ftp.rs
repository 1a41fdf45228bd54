//! Plain-FTP transport variant
//!
//! Thin wrapper around `suppaftp`'s blocking stream. Directory listings
//! come back as raw `LIST` lines and go through [`EntryParser`]; transfer
//! modes map onto the FTP `TYPE` command (ASCII transfers normalize line
//! endings on the wire, binary transfers are byte-exact).

use crate::transport::{to_wire_path, EntryParser, Transport};
use crate::types::{RemoteEntry, SyncError};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use suppaftp::types::{FileType, FormatControl};
use suppaftp::{FtpError, FtpStream, Status};
use tracing::{debug, warn};

/// Transport over a plain FTP control/data connection
pub struct FtpTransport {
    stream: FtpStream,
    parser: EntryParser,
    closed: bool,
}

impl FtpTransport {
    /// Connect and authenticate against an FTP server
    pub fn connect(host: &str, port: u16, user: &str, password: &str) -> Result<Self, SyncError> {
        let mut stream = FtpStream::connect((host, port)).map_err(map_ftp_err)?;
        if let Err(err) = stream.login(user, password) {
            // suppress the failure path's own errors; the login error wins
            let _ = stream.quit();
            return Err(map_ftp_err(err));
        }
        Ok(Self {
            stream,
            parser: EntryParser::new(),
            closed: false,
        })
    }
}

impl Transport for FtpTransport {
    fn current_dir(&mut self) -> Result<String, SyncError> {
        self.stream.pwd().map_err(map_ftp_err)
    }

    fn change_dir(&mut self, path: &str) -> Result<(), SyncError> {
        self.stream.cwd(to_wire_path(path)).map_err(map_ftp_err)
    }

    fn list_entries(&mut self, newest_first: bool) -> Result<Vec<RemoteEntry>, SyncError> {
        let lines = self.stream.list(None).map_err(map_ftp_err)?;
        let mut entries = Vec::with_capacity(lines.len());
        for line in lines {
            match self.parser.parse(&line) {
                Some(entry) => entries.push(entry),
                None => warn!(line = %line, "dropping unparseable listing line"),
            }
        }
        if newest_first {
            entries.sort_by(|a, b| b.modified.cmp(&a.modified));
        }
        Ok(entries)
    }

    fn list_names(&mut self) -> Result<Vec<String>, SyncError> {
        self.stream.nlst(None).map_err(map_ftp_err)
    }

    fn download_text(&mut self, remote: &str, local: &Path) -> Result<(), SyncError> {
        self.stream
            .transfer_type(FileType::Ascii(FormatControl::Default))
            .map_err(map_ftp_err)?;
        let text = self
            .stream
            .retr(&to_wire_path(remote), |reader| {
                let mut buf = Vec::new();
                reader
                    .read_to_end(&mut buf)
                    .map_err(FtpError::ConnectionError)?;
                Ok(buf)
            })
            .map_err(map_ftp_err)?;
        let text = String::from_utf8_lossy(&text).replace("\r\n", "\n");
        std::fs::write(local, text)?;
        Ok(())
    }

    fn download_binary(&mut self, remote: &str, local: &Path) -> Result<(), SyncError> {
        self.stream
            .transfer_type(FileType::Binary)
            .map_err(map_ftp_err)?;
        let mut file = File::create(local)?;
        self.stream
            .retr(&to_wire_path(remote), |reader| {
                io::copy(reader, &mut file).map_err(FtpError::ConnectionError)?;
                Ok(())
            })
            .map_err(map_ftp_err)?;
        Ok(())
    }

    fn upload_text(&mut self, local: &Path, remote: &str) -> Result<(), SyncError> {
        self.stream
            .transfer_type(FileType::Ascii(FormatControl::Default))
            .map_err(map_ftp_err)?;
        let mut file = File::open(local)?;
        self.stream
            .put_file(to_wire_path(remote), &mut file)
            .map_err(map_ftp_err)?;
        Ok(())
    }

    fn upload_binary(&mut self, local: &Path, remote: &str) -> Result<(), SyncError> {
        self.stream
            .transfer_type(FileType::Binary)
            .map_err(map_ftp_err)?;
        let mut file = File::open(local)?;
        self.stream
            .put_file(to_wire_path(remote), &mut file)
            .map_err(map_ftp_err)?;
        Ok(())
    }

    fn delete(&mut self, remote: &str) -> Result<(), SyncError> {
        self.stream.rm(to_wire_path(remote)).map_err(map_ftp_err)
    }

    fn close(&mut self) {
        if !self.closed {
            if let Err(err) = self.stream.quit() {
                debug!(error = %err, "error closing ftp session");
            }
            self.closed = true;
        }
    }
}

/// Map a suppaftp error into the crate taxonomy
fn map_ftp_err(err: FtpError) -> SyncError {
    match err {
        FtpError::ConnectionError(io) => SyncError::Io(io),
        FtpError::UnexpectedResponse(ref resp) => match resp.status {
            Status::NotLoggedIn => SyncError::Auth(err.to_string()),
            Status::FileUnavailable => SyncError::NotFound(err.to_string()),
            _ => SyncError::Protocol(err.to_string()),
        },
        other => SyncError::Protocol(other.to_string()),
    }
}
