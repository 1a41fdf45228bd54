//! Aggregate counters for one sync pass

use std::fmt;

/// Counters accumulated over a full sync walk
///
/// Mutated only by the sync engine, once per file decision, and read by
/// the caller after the walk completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Files downloaded from the remote
    pub copied: u64,

    /// Encrypted files successfully decrypted after download
    pub decrypted: u64,

    /// Files skipped because the local copy is up to date
    pub skipped: u64,

    /// Entries skipped because they matched the ignore pattern
    pub ignored: u64,
}

impl fmt::Display for SyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} copied, {} decrypted, {} skipped, {} ignored",
            self.copied, self.decrypted, self.skipped, self.ignored
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_zeroed() {
        let stats = SyncStats::default();
        assert_eq!(stats.copied, 0);
        assert_eq!(stats.decrypted, 0);
        assert_eq!(stats.skipped, 0);
        assert_eq!(stats.ignored, 0);
    }

    #[test]
    fn test_display_summary() {
        let stats = SyncStats {
            copied: 3,
            decrypted: 1,
            skipped: 2,
            ignored: 0,
        };
        assert_eq!(stats.to_string(), "3 copied, 1 decrypted, 2 skipped, 0 ignored");
    }
}
