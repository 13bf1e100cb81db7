//! Human-readable run reports.
//!
//! Each workflow finishes by assembling a [`RunReport`]: titled sections of
//! key/value lines plus free-form notes. The report renders to plain text for
//! the summary file and serializes to JSON unchanged.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportSection {
    pub title: String,
    pub lines: Vec<(String, String)>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunReport {
    pub title: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sections: Vec<ReportSection>,
}

impl RunReport {
    #[must_use]
    pub fn new(title: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            started_at,
            finished_at: Utc::now(),
            sections: Vec::new(),
        }
    }

    pub fn section(&mut self, title: impl Into<String>) -> &mut ReportSection {
        let index = self.sections.len();
        self.sections.push(ReportSection {
            title: title.into(),
            lines: Vec::new(),
            notes: Vec::new(),
        });
        &mut self.sections[index]
    }

    /// Render as the plain-text summary written next to the log file.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(64);
        out.push_str(&format!("{rule}\n{}\n{rule}\n", self.title));
        out.push_str(&format!(
            "Started:  {}\nFinished: {}\n",
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
        ));
        for section in &self.sections {
            out.push_str(&format!("\n{}\n{}\n", section.title, "-".repeat(section.title.len())));
            let width = section
                .lines
                .iter()
                .map(|(key, _)| key.len())
                .max()
                .unwrap_or(0);
            for (key, value) in &section.lines {
                out.push_str(&format!("  {key:<width$}  {value}\n"));
            }
            for note in &section.notes {
                out.push_str(&format!("  * {note}\n"));
            }
        }
        out
    }

    /// Write the rendered report to `path`.
    pub fn write_to(&self, path: &Path) -> Result<(), CoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CoreError::Artifact {
                path: path.display().to_string(),
                source,
            })?;
        }
        std::fs::write(path, self.render()).map_err(|source| CoreError::Artifact {
            path: path.display().to_string(),
            source,
        })
    }
}

impl ReportSection {
    pub fn line(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.lines.push((key.into(), value.into()));
        self
    }

    pub fn note(&mut self, note: impl Into<String>) -> &mut Self {
        self.notes.push(note.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn render_aligns_keys_and_keeps_notes() {
        let mut report = RunReport::new("Database migration", Utc::now());
        report
            .section("Summary")
            .line("succeeded", "2")
            .line("failed", "0")
            .note("table count mismatch on analytics (8/7)");

        let text = report.render();
        assert!(text.contains("Database migration"));
        assert!(text.contains("succeeded  2"));
        assert!(text.contains("* table count mismatch on analytics (8/7)"));
    }

    #[test]
    fn write_to_creates_parent_dirs() {
        let dir = std::env::temp_dir().join(format!("upr-report-{}", std::process::id()));
        let path = dir.join("nested").join("report.txt");
        let report = RunReport::new("Repair", Utc::now());
        report.write_to(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, report.render());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
