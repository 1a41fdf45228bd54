//! Differential sync engine
//!
//! Recursively walks a remote directory tree through a [`Transport`],
//! downloads entries the staleness policy flags as changed, and hands
//! encrypted payloads to the [`Decryptor`] collaborator. Traversal state
//! (local and remote directory) is threaded through each recursive call
//! as explicit parameters; the transport's working directory is the only
//! session state, protected by an acquire/restore discipline on every
//! exit path.

use crate::config::SyncOptions;
use crate::pgp::Decryptor;
use crate::transport::Transport;
use crate::types::{RemoteEntry, SyncError, SyncStats};
use chrono::{DateTime, Local};
use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, error, info, warn};

/// Result of a full site sync: every successfully synced (or decrypted)
/// local path, in depth-first, per-directory-newest-first order, plus the
/// aggregate counters.
#[derive(Debug, Default)]
pub struct SyncOutcome {
    pub files: Vec<PathBuf>,
    pub stats: SyncStats,
}

/// Sync the configured site through an established transport
///
/// Individual file failures never escape this call; a directory-level
/// fault (navigation or listing) aborts the walk and propagates.
pub fn sync_site(
    cn: &mut dyn Transport,
    options: &SyncOptions,
    decryptor: &dyn Decryptor,
) -> Result<SyncOutcome, SyncError> {
    info!(site = %options.site, "syncing remote site");
    let mut stats = SyncStats::default();
    let mut files = Vec::new();
    sync_directory(
        cn,
        options,
        decryptor,
        &mut stats,
        &mut files,
        &options.local_dir,
        &options.remote_dir,
    )?;
    info!(%stats, "sync finished");
    Ok(SyncOutcome { files, stats })
}

/// Sync one remote directory into one local directory, recursively
///
/// On entry the transport's working directory is recorded; it is restored
/// on every exit path, so sibling recursive calls never observe a child's
/// navigation. Per-file errors are caught and logged; an error escaping a
/// directory recursion propagates (the documented failure mode for
/// directory-level faults).
pub fn sync_directory(
    cn: &mut dyn Transport,
    options: &SyncOptions,
    decryptor: &dyn Decryptor,
    stats: &mut SyncStats,
    files: &mut Vec<PathBuf>,
    local_dir: &Path,
    remote_dir: &str,
) -> Result<(), SyncError> {
    info!(remote = remote_dir, "syncing directory");
    let prior = cn.current_dir()?;
    debug!(to = remote_dir, "entering directory");
    cn.change_dir(remote_dir)?;
    let walk = walk_entries(cn, options, decryptor, stats, files, local_dir, remote_dir);
    debug!(to = %prior, "restoring directory");
    if let Err(err) = cn.change_dir(&prior) {
        // the walk's own result still wins; the failed restore is surfaced
        warn!(dir = %prior, error = %err, "failed to restore working directory");
    }
    walk
}

fn walk_entries(
    cn: &mut dyn Transport,
    options: &SyncOptions,
    decryptor: &dyn Decryptor,
    stats: &mut SyncStats,
    files: &mut Vec<PathBuf>,
    local_dir: &Path,
    remote_dir: &str,
) -> Result<(), SyncError> {
    let entries = cn.list_entries(true)?;
    for entry in entries {
        if let Some(pattern) = &options.ignore_pattern {
            if pattern.is_match(&entry.name) {
                debug!(name = %entry.name, "ignoring entry matching ignore pattern");
                stats.ignored += 1;
                continue;
            }
        }
        if entry.is_dir {
            sync_directory(
                cn,
                options,
                decryptor,
                stats,
                files,
                &local_dir.join(&entry.name),
                &join_remote(remote_dir, &entry.name),
            )?;
            continue;
        }
        match sync_file(cn, options, decryptor, stats, &entry, local_dir, remote_dir) {
            Ok(Some(path)) => files.push(path),
            Ok(None) => {}
            Err(err) => {
                error!(
                    remote = remote_dir,
                    name = %entry.name,
                    error = %err,
                    "error syncing file"
                );
            }
        }
    }
    Ok(())
}

/// Sync a single remote file; returns the resulting local path, or None
/// when nothing was copied
///
/// Decision order: age filter (no counter), staleness check (`skipped`),
/// download (`copied`), decrypt handoff (`decrypted`). Any error during
/// download or decrypt propagates to the per-file catch in the walk.
fn sync_file(
    cn: &mut dyn Transport,
    options: &SyncOptions,
    decryptor: &dyn Decryptor,
    stats: &mut SyncStats,
    entry: &RemoteEntry,
    local_dir: &Path,
    remote_dir: &str,
) -> Result<Option<PathBuf>, SyncError> {
    if let Some(days) = options.ignore_older_than {
        let cutoff = Local::now() - chrono::Duration::days(days);
        if entry.modified < cutoff {
            debug!(
                remote = remote_dir,
                name = %entry.name,
                modified = %entry.modified,
                "file is too old, skipping"
            );
            return Ok(None);
        }
    }

    let local_file = local_dir.join(&entry.name);
    let local_pgp_file = local_dir.join(".pgp").join(&entry.name);

    if !options.ignore_local {
        let existing = if local_file.exists() {
            Some(&local_file)
        } else if local_pgp_file.exists() {
            Some(&local_pgp_file)
        } else {
            None
        };
        if let Some(existing) = existing {
            let meta = fs::metadata(existing)?;
            if !needs_download(entry, &meta, options.ignore_size) {
                debug!(remote = remote_dir, name = %entry.name, "file has not changed, skipping");
                stats.skipped += 1;
                return Ok(None);
            }
        }
    }

    debug!(
        remote = remote_dir,
        name = %entry.name,
        local = %local_file.display(),
        "downloading file"
    );
    let mut result = None;
    if let Some(parent) = local_file.parent() {
        // pre-existing directories are fine; real failures surface at download
        let _ = fs::create_dir_all(parent);
    }

    if !options.no_copy {
        cn.download_binary(&entry.name, &local_file)?;
        let mtime = FileTime::from_system_time(SystemTime::from(entry.modified));
        if let Err(err) = filetime::set_file_mtime(&local_file, mtime) {
            warn!(file = %local_file.display(), error = %err, "could not set modification time");
        }
        stats.copied += 1;
        result = Some(local_file.clone());
    }

    if !options.no_copy && !options.no_decrypt && (options.is_encrypted)(&entry.name) {
        let plain_name = (options.rename_pgp)(&entry.name);
        decryptor.decrypt(&entry.name, &plain_name, local_dir)?;
        // keep the encrypted original for future staleness comparisons,
        // relocated so it does not clutter the mirrored tree
        if let Some(parent) = local_pgp_file.parent() {
            let _ = fs::create_dir_all(parent);
        }
        fs::rename(&local_file, &local_pgp_file)?;
        stats.decrypted += 1;
        result = Some(local_dir.join(plain_name));
    }

    Ok(result)
}

/// Staleness policy: does this remote entry require a download?
///
/// Unchanged when the local modification time is at or after the remote
/// one AND (size checking is off OR the sizes agree). A same-timestamp
/// size mismatch therefore re-downloads only when size checking is on,
/// which keeps clock-skew-only differences from forcing transfers.
pub fn needs_download(entry: &RemoteEntry, local: &fs::Metadata, ignore_size: bool) -> bool {
    let local_mtime = match local.modified() {
        Ok(mtime) => DateTime::<Local>::from(mtime),
        Err(_) => return true,
    };
    if entry.modified > local_mtime {
        return true;
    }
    !(ignore_size || entry.size == local.len())
}

/// Join a remote directory and an entry name with wire (forward-slash)
/// semantics
pub fn join_remote(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else if base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn entry_with(size: u64, modified: DateTime<Local>) -> RemoteEntry {
        RemoteEntry::new(String::new(), "data.csv".to_string(), false, size, modified)
    }

    fn write_local(dir: &Path, len: usize, mtime: DateTime<Local>) -> std::fs::Metadata {
        let path = dir.join("data.csv");
        fs::write(&path, vec![b'x'; len]).expect("write local file");
        let ft = FileTime::from_system_time(SystemTime::from(mtime));
        filetime::set_file_mtime(&path, ft).expect("set mtime");
        fs::metadata(&path).expect("stat local file")
    }

    #[test]
    fn test_remote_newer_needs_download() {
        let tmp = TempDir::new().expect("tempdir");
        let t = Local.with_ymd_and_hms(2024, 9, 7, 12, 0, 0).unwrap();
        let meta = write_local(tmp.path(), 10, t);

        let entry = entry_with(10, t + chrono::Duration::hours(1));
        assert!(needs_download(&entry, &meta, false));
    }

    #[test]
    fn test_equal_time_and_size_is_unchanged() {
        let tmp = TempDir::new().expect("tempdir");
        let t = Local.with_ymd_and_hms(2024, 9, 7, 12, 0, 0).unwrap();
        let meta = write_local(tmp.path(), 10, t);

        let entry = entry_with(10, t);
        assert!(!needs_download(&entry, &meta, false));
    }

    #[test]
    fn test_local_newer_is_unchanged() {
        let tmp = TempDir::new().expect("tempdir");
        let t = Local.with_ymd_and_hms(2024, 9, 7, 12, 0, 0).unwrap();
        let meta = write_local(tmp.path(), 10, t);

        let entry = entry_with(10, t - chrono::Duration::days(1));
        assert!(!needs_download(&entry, &meta, false));
    }

    #[test]
    fn test_same_time_size_mismatch_downloads_when_size_checked() {
        let tmp = TempDir::new().expect("tempdir");
        let t = Local.with_ymd_and_hms(2024, 9, 7, 12, 0, 0).unwrap();
        let meta = write_local(tmp.path(), 10, t);

        let entry = entry_with(99, t);
        assert!(needs_download(&entry, &meta, false));
        // with size checking off the timestamp alone decides
        assert!(!needs_download(&entry, &meta, true));
    }

    #[test]
    fn test_join_remote() {
        assert_eq!(join_remote("/", "incoming"), "/incoming");
        assert_eq!(join_remote("/outgoing", "reports"), "/outgoing/reports");
        assert_eq!(join_remote("", "reports"), "reports");
    }
}
