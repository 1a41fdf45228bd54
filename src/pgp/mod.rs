//! PGP decryption collaborator
//!
//! Decryption itself is external: [`GpgDecryptor`] shells out to the
//! configured gpg binary and feeds the passphrase on stdin. The engine
//! only sees the [`Decryptor`] trait, so tests can substitute a fake.
//! Also hosts the default encrypted-name convention and the offline
//! recovery pass that decrypts already-downloaded files.

use crate::config::{GpgConfig, SyncOptions};
use crate::types::SyncError;
use chrono::{DateTime, Datelike, Local};
use regex::Regex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, error, info};
use walkdir::WalkDir;

/// Known gpg stderr fragments that mean the decryption did not produce
/// usable plaintext even when the process itself ran
pub const DECRYPT_FAILURE_MARKERS: [&str; 2] = ["secret key not available", "file open error"];

/// Decrypts one downloaded file into a plaintext sibling
pub trait Decryptor {
    /// Decrypt `local_dir/source_name` into `local_dir/dest_name`
    fn decrypt(&self, source_name: &str, dest_name: &str, local_dir: &Path)
        -> Result<(), SyncError>;
}

/// Decryptor that invokes an external GnuPG binary
pub struct GpgDecryptor {
    config: GpgConfig,
}

impl GpgDecryptor {
    pub fn new(config: GpgConfig) -> Self {
        Self { config }
    }
}

impl Decryptor for GpgDecryptor {
    fn decrypt(
        &self,
        source_name: &str,
        dest_name: &str,
        local_dir: &Path,
    ) -> Result<(), SyncError> {
        if source_name == dest_name {
            return Err(SyncError::Decrypt {
                file: source_name.to_string(),
                detail: "source and destination names cannot be the same".to_string(),
            });
        }
        debug!(source = source_name, dest = dest_name, "decrypting file");

        let mut cmd = Command::new(&self.config.exe);
        if let Some(homedir) = &self.config.homedir {
            cmd.arg("--homedir").arg(homedir);
        }
        cmd.arg("--batch")
            .arg("--yes")
            .arg("--passphrase-fd")
            .arg("0");
        if let Some(extension) = &self.config.load_extension {
            cmd.arg("--load-extension").arg(extension);
        }
        cmd.arg("--output")
            .arg(local_dir.join(dest_name))
            .arg("--decrypt")
            .arg(local_dir.join(source_name))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(self.config.passphrase.as_bytes())?;
            // dropping the handle closes gpg's stdin
        }
        let output = child.wait_with_output()?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        for marker in DECRYPT_FAILURE_MARKERS {
            if stderr.contains(marker) {
                return Err(SyncError::Decrypt {
                    file: source_name.to_string(),
                    detail: marker.to_string(),
                });
            }
        }
        if !output.status.success() {
            return Err(SyncError::Decrypt {
                file: source_name.to_string(),
                detail: format!("gpg exited with {}", output.status),
            });
        }
        Ok(())
    }
}

/// Default encrypted-name predicate: any dotted name component is "pgp"
pub fn is_encrypted(filename: &str) -> bool {
    base_name(filename).split('.').any(|part| part == "pgp")
}

/// Default plaintext-name transform: drop the first "pgp" component
pub fn rename_pgp(filename: &str) -> String {
    let name = base_name(filename);
    let mut parts: Vec<&str> = name.split('.').collect();
    if let Some(pos) = parts.iter().position(|part| *part == "pgp") {
        parts.remove(pos);
    }
    parts.join(".")
}

fn base_name(filename: &str) -> &str {
    Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(filename)
}

/// Folders excluded from the offline decrypt pass: archive-style names,
/// the `.pgp` directories themselves, and year folders other than the
/// current one
struct FolderFilter {
    archive: Regex,
    year: Regex,
    current_year: i32,
}

impl FolderFilter {
    fn new() -> Self {
        Self {
            archive: Regex::new(r"(?i)prev|legacy|old|archive|depr|pgp")
                .expect("archive pattern is valid"),
            year: Regex::new(r"(\d{4})").expect("year pattern is valid"),
            current_year: Local::now().year(),
        }
    }

    fn skip(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        if self.archive.is_match(&text) {
            return true;
        }
        if let Some(caps) = self.year.captures(&text) {
            return caps[1].parse::<i32>().ok() != Some(self.current_year);
        }
        false
    }
}

/// Recovery pass: decrypt every encrypted file already present under the
/// local root and relocate the originals to `.pgp/` subdirectories
///
/// Used when a previous run downloaded payloads but decryption was
/// skipped or failed. Per-file decrypt errors are logged and the walk
/// continues; the returned list holds the plaintext paths produced.
pub fn decrypt_all_pgp_files(
    options: &SyncOptions,
    decryptor: &dyn Decryptor,
) -> Result<Vec<PathBuf>, SyncError> {
    let filter = FolderFilter::new();
    let mut files = Vec::new();
    info!(root = %options.local_dir.display(), "decrypting saved pgp files");

    for entry in WalkDir::new(&options.local_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let local_dir = match entry.path().parent() {
            Some(parent) => parent.to_path_buf(),
            None => continue,
        };
        // the filter sees the path relative to the sync root, so parent
        // directory names outside the mirror never suppress a folder
        let relative = local_dir
            .strip_prefix(&options.local_dir)
            .unwrap_or(local_dir.as_path());
        if filter.skip(relative) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !(options.is_encrypted)(&name) {
            continue;
        }

        if let Some(days) = options.ignore_older_than {
            let meta = fs::metadata(entry.path())?;
            let created = meta.created().or_else(|_| meta.modified())?;
            let created = DateTime::<Local>::from(created);
            if created < Local::now() - chrono::Duration::days(days) {
                debug!(file = %entry.path().display(), created = %created, "file is too old, skipping");
                continue;
            }
        }

        let new_name = (options.rename_pgp)(&name);
        if let Err(err) = decryptor.decrypt(&name, &new_name, &local_dir) {
            error!(file = %entry.path().display(), error = %err, "error decrypting file");
            continue;
        }
        let pgp_file = local_dir.join(".pgp").join(&name);
        if let Some(parent) = pgp_file.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Err(err) = fs::rename(entry.path(), &pgp_file) {
            error!(file = %entry.path().display(), error = %err, "error archiving encrypted file");
            continue;
        }
        files.push(local_dir.join(new_name));
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_encrypted_detects_pgp_component() {
        assert!(is_encrypted("data.pgp"));
        assert!(is_encrypted("foobarbaz.txt.pgp.20000907"));
        assert!(is_encrypted("/incoming/reports/data.csv.pgp"));
    }

    #[test]
    fn test_is_encrypted_ignores_partial_matches() {
        assert!(!is_encrypted("report.txt"));
        assert!(!is_encrypted("pgpkeys.txt"));
        assert!(!is_encrypted("data.pgpx"));
    }

    #[test]
    fn test_rename_pgp_drops_component() {
        assert_eq!(rename_pgp("data.pgp"), "data");
        assert_eq!(rename_pgp("foobarbaz.txt.pgp.20000907"), "foobarbaz.txt.20000907");
        assert_eq!(rename_pgp("report.csv.pgp"), "report.csv");
    }

    #[test]
    fn test_rename_pgp_drops_only_first_component() {
        assert_eq!(rename_pgp("a.pgp.pgp"), "a.pgp");
    }

    #[test]
    fn test_folder_filter_archive_names() {
        let filter = FolderFilter::new();
        assert!(filter.skip(Path::new("archive")));
        assert!(filter.skip(Path::new("LEGACY/reports")));
        assert!(filter.skip(Path::new(".pgp")));
        assert!(filter.skip(Path::new("incoming/.pgp")));
        assert!(!filter.skip(Path::new("incoming")));
    }

    #[test]
    fn test_folder_filter_year_folders() {
        let filter = FolderFilter::new();
        let this_year = Local::now().year();
        assert!(!filter.skip(Path::new(&this_year.to_string())));
        assert!(filter.skip(Path::new("1999")));
    }
}
