//! Configuration management
//!
//! All configuration is loaded once at startup into immutable structs and
//! passed by reference into the components that need it. The config file
//! is toml: a `[gpg]` section plus one `[sites.<name>]` table per remote
//! site.

use crate::pgp;
use crate::transport::to_wire_path;
use crate::types::SyncError;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration file contents
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// GnuPG invocation settings
    #[serde(default)]
    pub gpg: GpgConfig,

    /// Site definitions, keyed by the identifier given on the command line
    #[serde(default)]
    pub sites: BTreeMap<String, SiteConfig>,
}

/// Settings for invoking the external gpg binary
#[derive(Debug, Clone, Deserialize)]
pub struct GpgConfig {
    /// Path to the gpg executable
    #[serde(default = "default_gpg_exe")]
    pub exe: PathBuf,

    /// Keyring home directory (gpg's own default when unset)
    #[serde(default)]
    pub homedir: Option<PathBuf>,

    /// Passphrase fed to gpg on stdin
    #[serde(default = "default_passphrase")]
    pub passphrase: String,

    /// Optional cipher extension loaded with --load-extension
    #[serde(default)]
    pub load_extension: Option<String>,
}

impl Default for GpgConfig {
    fn default() -> Self {
        Self {
            exe: default_gpg_exe(),
            homedir: None,
            passphrase: default_passphrase(),
            load_extension: None,
        }
    }
}

fn default_gpg_exe() -> PathBuf {
    PathBuf::from("gpg")
}

fn default_passphrase() -> String {
    "password".to_string()
}

/// One remote site definition
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub hostname: String,
    pub username: String,
    pub password: String,

    /// Use the secure (SFTP) transport instead of plain FTP
    #[serde(default)]
    pub secure: bool,

    /// Port override (21 for plain, 22 for secure when unset)
    #[serde(default)]
    pub port: Option<u16>,

    /// Remote directory to mirror
    #[serde(default = "default_remote_dir")]
    pub remote_dir: String,

    /// Local root the remote tree is mirrored under
    pub local_dir: PathBuf,

    /// Regex; matching entry names are not synced or descended into
    #[serde(default)]
    pub ignore_pattern: Option<String>,
}

fn default_remote_dir() -> String {
    "/".to_string()
}

impl Config {
    /// Load and parse the configuration file
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let text = fs::read_to_string(path)
            .map_err(|err| SyncError::Config(format!("cannot read {}: {err}", path.display())))?;
        toml::from_str(&text)
            .map_err(|err| SyncError::Config(format!("cannot parse {}: {err}", path.display())))
    }

    /// Look up a site definition by its identifier
    pub fn site(&self, name: &str) -> Result<&SiteConfig, SyncError> {
        self.sites
            .get(name)
            .ok_or_else(|| SyncError::Config(format!("unknown site: {name}")))
    }
}

/// Per-run options consumed by the sync engine
///
/// Immutable once constructed; traversal state is never stored here (it
/// is threaded through the engine's recursion as explicit parameters).
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Site identifier, for logging
    pub site: String,

    pub hostname: String,
    pub username: String,
    pub password: String,
    pub secure: bool,
    pub port: Option<u16>,

    /// Remote root to mirror (wire separators)
    pub remote_dir: String,

    /// Local root the mirror is written under
    pub local_dir: PathBuf,

    /// Entries whose name matches are counted as ignored and skipped
    pub ignore_pattern: Option<Regex>,

    /// Do not download anything
    pub no_copy: bool,

    /// Do not decrypt downloaded files
    pub no_decrypt: bool,

    /// Ignore local state when deciding whether to download
    pub ignore_local: bool,

    /// Skip the size comparison in the staleness check
    pub ignore_size: bool,

    /// Skip remote files older than this many days
    pub ignore_older_than: Option<i64>,

    /// Encrypted-name predicate (pluggable per site)
    pub is_encrypted: fn(&str) -> bool,

    /// Encrypted-to-plaintext name transform (pluggable per site)
    pub rename_pgp: fn(&str) -> String,
}

impl SyncOptions {
    /// Build run options from a site definition
    pub fn for_site(name: &str, site: &SiteConfig) -> Result<Self, SyncError> {
        if site.hostname.is_empty() {
            return Err(SyncError::Config(format!("site {name}: hostname is required")));
        }
        if site.local_dir.as_os_str().is_empty() {
            return Err(SyncError::Config(format!("site {name}: local_dir is required")));
        }
        let ignore_pattern = match &site.ignore_pattern {
            Some(pattern) => Some(Regex::new(pattern).map_err(|err| {
                SyncError::Config(format!("site {name}: invalid ignore pattern '{pattern}': {err}"))
            })?),
            None => None,
        };
        Ok(Self {
            site: name.to_string(),
            hostname: site.hostname.clone(),
            username: site.username.clone(),
            password: site.password.clone(),
            secure: site.secure,
            port: site.port,
            remote_dir: to_wire_path(&site.remote_dir),
            local_dir: site.local_dir.clone(),
            ignore_pattern,
            no_copy: false,
            no_decrypt: false,
            ignore_local: false,
            ignore_size: false,
            ignore_older_than: None,
            is_encrypted: pgp::is_encrypted,
            rename_pgp: pgp::rename_pgp,
        })
    }
}
