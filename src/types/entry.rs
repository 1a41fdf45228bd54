//! RemoteEntry - Represents a single record in a remote directory listing

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Represents one entry in a remote directory listing
///
/// Constructed once per listing line (or per SFTP attribute record),
/// immutable afterwards, and discarded when the sync pass finishes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteEntry {
    /// Original listing text, kept for diagnostics only
    pub raw_line: String,

    /// Base file or directory name, unique within its parent listing
    pub name: String,

    /// Whether the entry is a directory
    pub is_dir: bool,

    /// Size in bytes (0 for directories)
    pub size: u64,

    /// Modification time parsed from the listing, local timezone
    pub modified: DateTime<Local>,
}

impl RemoteEntry {
    /// Create a new RemoteEntry with the given parameters
    pub fn new(
        raw_line: String,
        name: String,
        is_dir: bool,
        size: u64,
        modified: DateTime<Local>,
    ) -> Self {
        Self {
            raw_line,
            name,
            is_dir,
            size,
            modified,
        }
    }
}
