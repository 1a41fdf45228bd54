//! Directory-listing line parser
//!
//! Remote FTP servers answer `LIST` with Unix `ls -l`-style text. Two
//! fixed patterns are recognized, tried in order; the first match wins.
//! A line matching neither pattern is not an entry and yields None - the
//! transport logs and drops it rather than failing the listing.

use crate::types::RemoteEntry;
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone};
use regex::Regex;

/// The two recognized listing shapes.
///
/// Typical entry:
///   drwxr-xr-x 2   4100            4100    4096    Sep 07 17:54 incoming
///   -rw-r--r-- 1   4100            4100    29948   Sep 07 22:35 foobarbaz.txt.pgp.20000907
/// Alternate shape that leaves out the group field:
///   drwxrwx--x   3 500         2048 Sep  7 19:00 incoming
///   -rw-r--r--   1 500        19045 Sep  7 06:10 20000907.FOO.BAR_BAZ.csv.asc
const LIST_PATTERNS: [&str; 2] = [
    r"([drwx-]+)\s+\d+\s+\w+\s+\w+\s+(\d+)\s+(\w+\s+\d+\s+[\d:]+)\s+(.*?)\s*$",
    r"([drwx-]+)\s+\d+\s+\w+\s+(\d+)\s+(\w+\s+\d+\s+[\d:]+)\s+(.*?)\s*$",
];

/// Parses raw listing lines into [`RemoteEntry`] values
pub struct EntryParser {
    patterns: Vec<Regex>,
}

impl EntryParser {
    pub fn new() -> Self {
        let patterns = LIST_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("listing pattern is valid"))
            .collect();
        Self { patterns }
    }

    /// Parse one listing line
    ///
    /// Returns None when the line matches neither pattern, or when a
    /// matched line carries an unparseable size or date field. Directory
    /// detection is the first character of the permission token.
    pub fn parse(&self, line: &str) -> Option<RemoteEntry> {
        for pattern in &self.patterns {
            if let Some(caps) = pattern.captures(line) {
                let perms = caps.get(1)?.as_str();
                let size: u64 = caps.get(2)?.as_str().parse().ok()?;
                let modified = parse_listing_date(caps.get(3)?.as_str())?;
                let name = caps.get(4)?.as_str().to_string();
                return Some(RemoteEntry::new(
                    line.to_string(),
                    name,
                    perms.starts_with('d'),
                    size,
                    modified,
                ));
            }
        }
        None
    }
}

impl Default for EntryParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the date field of a listing line into a local timestamp
///
/// Recent files carry "Mon DD HH:MM" (year-less, the current year is
/// assumed); older files carry "Mon DD YYYY" (midnight assumed).
fn parse_listing_date(text: &str) -> Option<DateTime<Local>> {
    let squeezed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let year = Local::now().year();
    if let Ok(naive) =
        NaiveDateTime::parse_from_str(&format!("{squeezed} {year}"), "%b %d %H:%M %Y")
    {
        return Local.from_local_datetime(&naive).earliest();
    }
    if let Ok(date) = NaiveDate::parse_from_str(&squeezed, "%b %d %Y") {
        return Local.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).earliest();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn parser() -> EntryParser {
        EntryParser::new()
    }

    #[test]
    fn test_parse_typical_file_entry() {
        let line = "-rw-r--r-- 1   4100            4100    29948   Sep 07 22:35 foobarbaz.txt.pgp.20000907";
        let entry = parser().parse(line).expect("line should parse");

        assert_eq!(entry.name, "foobarbaz.txt.pgp.20000907");
        assert!(!entry.is_dir);
        assert_eq!(entry.size, 29948);
        assert_eq!(entry.modified.month(), 9);
        assert_eq!(entry.modified.day(), 7);
        assert_eq!(entry.modified.hour(), 22);
        assert_eq!(entry.modified.minute(), 35);
        assert_eq!(entry.raw_line, line);
    }

    #[test]
    fn test_parse_typical_directory_entry() {
        let line = "drwxr-xr-x 2   4100            4100    4096    Sep 07 17:54 incoming";
        let entry = parser().parse(line).expect("line should parse");

        assert!(entry.is_dir);
        assert_eq!(entry.name, "incoming");
        assert_eq!(entry.size, 4096);
    }

    #[test]
    fn test_parse_alternate_entry_without_group() {
        let line = "-rw-r--r--   1 500        19045 Sep  7 06:10 20000907.FOO.BAR_BAZ.csv.asc";
        let entry = parser().parse(line).expect("line should parse");

        assert_eq!(entry.name, "20000907.FOO.BAR_BAZ.csv.asc");
        assert_eq!(entry.size, 19045);
        assert_eq!(entry.modified.day(), 7);
    }

    #[test]
    fn test_parse_name_containing_spaces() {
        let line = "-rw-r--r-- 1   4100   4100   512   Sep 08 10:42 monthly report final.xlsx";
        let entry = parser().parse(line).expect("line should parse");

        assert_eq!(entry.name, "monthly report final.xlsx");
    }

    #[test]
    fn test_parse_year_form_date() {
        let line = "-rw-r--r-- 1   4100   4100   1024   Sep 07 2019 archive.zip";
        let entry = parser().parse(line).expect("line should parse");

        assert_eq!(entry.modified.year(), 2019);
        assert_eq!(entry.modified.hour(), 0);
    }

    #[test]
    fn test_malformed_line_missing_size_is_dropped() {
        // no size column; matches neither pattern
        let line = "drwxr-xr-x 2 4100 Sep 07 17:54 incoming";
        assert!(parser().parse(line).is_none());
    }

    #[test]
    fn test_non_listing_noise_is_dropped() {
        assert!(parser().parse("total 42").is_none());
        assert!(parser().parse("").is_none());
        assert!(parser().parse("226 Transfer complete.").is_none());
    }
}
