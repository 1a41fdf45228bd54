//! Offline decrypt-all recovery pass tests.

use sitesync::pgp::{decrypt_all_pgp_files, Decryptor};
use sitesync::{SyncError, SyncOptions};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

struct FakeDecryptor;

impl Decryptor for FakeDecryptor {
    fn decrypt(
        &self,
        source_name: &str,
        dest_name: &str,
        local_dir: &Path,
    ) -> Result<(), SyncError> {
        let payload = fs::read(local_dir.join(source_name))?;
        fs::write(local_dir.join(dest_name), payload)?;
        Ok(())
    }
}

fn options_for(local: &Path) -> SyncOptions {
    SyncOptions {
        site: "test".to_string(),
        hostname: "ftp.example.com".to_string(),
        username: "user".to_string(),
        password: "pass".to_string(),
        secure: false,
        port: None,
        remote_dir: "/".to_string(),
        local_dir: local.to_path_buf(),
        ignore_pattern: None,
        no_copy: false,
        no_decrypt: false,
        ignore_local: false,
        ignore_size: false,
        ignore_older_than: None,
        is_encrypted: sitesync::pgp::is_encrypted,
        rename_pgp: sitesync::pgp::rename_pgp,
    }
}

#[test]
fn test_decrypts_saved_files_and_archives_originals() {
    let local = TempDir::new().expect("create tempdir");
    fs::create_dir_all(local.path().join("reports")).expect("create subdir");
    fs::write(local.path().join("data.pgp"), b"payload-1").expect("write root payload");
    fs::write(local.path().join("reports/other.csv.pgp"), b"payload-2")
        .expect("write nested payload");
    fs::write(local.path().join("plain.txt"), b"untouched").expect("write plaintext");

    let files = decrypt_all_pgp_files(&options_for(local.path()), &FakeDecryptor)
        .expect("recovery pass succeeds");

    assert_eq!(files.len(), 2);
    assert!(local.path().join("data").exists());
    assert!(local.path().join(".pgp/data.pgp").exists());
    assert!(local.path().join("reports/other.csv").exists());
    assert!(local.path().join("reports/.pgp/other.csv.pgp").exists());
    // plaintext neighbors are untouched
    assert_eq!(
        fs::read(local.path().join("plain.txt")).expect("read plaintext"),
        b"untouched"
    );
}

#[test]
fn test_archive_folders_are_not_reprocessed() {
    let local = TempDir::new().expect("create tempdir");
    fs::create_dir_all(local.path().join(".pgp")).expect("create .pgp dir");
    fs::write(local.path().join(".pgp/done.pgp"), b"already-archived").expect("write archived");
    fs::create_dir_all(local.path().join("legacy")).expect("create legacy dir");
    fs::write(local.path().join("legacy/old.pgp"), b"legacy-payload").expect("write legacy");

    let files = decrypt_all_pgp_files(&options_for(local.path()), &FakeDecryptor)
        .expect("recovery pass succeeds");

    assert!(files.is_empty());
    assert!(local.path().join(".pgp/done.pgp").exists());
    assert!(local.path().join("legacy/old.pgp").exists());
}
