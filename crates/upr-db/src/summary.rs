//! Aggregate outcome of a migration batch.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use upr_core::entities::DatabaseRecord;
use upr_core::enums::DbOutcome;
use upr_core::report::RunReport;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationSummary {
    pub started_at: DateTime<Utc>,
    pub records: Vec<DatabaseRecord>,
}

impl MigrationSummary {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.outcome == DbOutcome::Succeeded)
            .count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.outcome == DbOutcome::Failed)
            .count()
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.records.iter().map(|record| record.warnings.len()).sum()
    }

    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.records.iter().map(|record| record.duration).sum()
    }

    /// Process exit status: the number of failed databases, capped below the
    /// shell-reserved range.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::try_from(self.failed()).unwrap_or(125).min(125)
    }

    #[must_use]
    pub fn report(&self) -> RunReport {
        let mut report = RunReport::new("Uproot database migration", self.started_at);
        {
            let summary = report.section("Summary");
            summary
                .line("databases", self.records.len().to_string())
                .line("succeeded", self.succeeded().to_string())
                .line("failed", self.failed().to_string())
                .line("warnings", self.warning_count().to_string())
                .line(
                    "total time",
                    format!("{}s", self.total_duration().as_secs()),
                );
        }
        let databases = report.section("Databases");
        for record in &self.records {
            let counts = match (record.source_tables, record.dest_tables) {
                (Some(source), Some(dest)) => format!(" (tables {source}/{dest})"),
                _ => String::new(),
            };
            databases.line(
                record.name.clone(),
                format!("{}{counts}", record.outcome.as_str()),
            );
            for warning in &record.warnings {
                databases.note(format!("{}: {warning}", record.name));
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn record(name: &str, outcome: DbOutcome, warnings: usize) -> DatabaseRecord {
        DatabaseRecord {
            name: name.into(),
            source_tables: None,
            dest_tables: None,
            duration: Duration::from_secs(1),
            outcome,
            warnings: (0..warnings).map(|i| format!("warning {i}")).collect(),
        }
    }

    #[rstest::rstest]
    #[case(&[], 0)]
    #[case(&[DbOutcome::Succeeded, DbOutcome::Succeeded], 0)]
    #[case(&[DbOutcome::Succeeded, DbOutcome::Failed, DbOutcome::Failed], 2)]
    #[case(&[DbOutcome::Skipped, DbOutcome::Failed], 1)]
    fn exit_code_is_failed_count(#[case] outcomes: &[DbOutcome], #[case] expected: i32) {
        let summary = MigrationSummary {
            started_at: Utc::now(),
            records: outcomes
                .iter()
                .enumerate()
                .map(|(i, outcome)| record(&format!("db{i}"), *outcome, 0))
                .collect(),
        };
        assert_eq!(summary.exit_code(), expected);
    }

    #[test]
    fn counters_split_by_outcome() {
        let summary = MigrationSummary {
            started_at: Utc::now(),
            records: vec![
                record("app", DbOutcome::Succeeded, 0),
                record("analytics", DbOutcome::Failed, 1),
            ],
        };
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.warning_count(), 1);
    }

    #[test]
    fn report_lists_every_database() {
        let summary = MigrationSummary {
            started_at: Utc::now(),
            records: vec![record("app", DbOutcome::Succeeded, 1)],
        };
        let text = summary.report().render();
        assert!(text.contains("app"));
        assert!(text.contains("succeeded"));
        assert!(text.contains("warning 0"));
    }
}
