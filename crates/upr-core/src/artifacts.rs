//! Timestamped artifact paths.
//!
//! Logs, reports, and backup archives are all named with a per-run timestamp
//! so successive runs never collide and old artifacts remain inspectable.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// `<dir>/<prefix>-YYYYmmdd-HHMMSS.<ext>`
#[must_use]
pub fn timestamped_path(dir: &Path, prefix: &str, ext: &str, at: DateTime<Utc>) -> PathBuf {
    dir.join(format!("{prefix}-{}.{ext}", at.format("%Y%m%d-%H%M%S")))
}

/// Last `count` lines of a text blob, used when echoing the tail of a failed
/// step's log back to the operator.
#[must_use]
pub fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamped_path_embeds_run_time() {
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        let path = timestamped_path(Path::new("/var/log/uproot"), "db-migration", "log", at);
        assert_eq!(
            path,
            PathBuf::from("/var/log/uproot/db-migration-20260314-092653.log")
        );
    }

    #[test]
    fn tail_lines_returns_whole_text_when_short() {
        assert_eq!(tail_lines("a\nb", 20), "a\nb");
        assert_eq!(tail_lines("a\nb\nc\nd", 2), "c\nd");
    }
}
