//! Per-run context threaded through every workflow.
//!
//! The shell ancestry of this tool kept failure counts and warning tallies in
//! process globals; here the counters live in an explicit value owned by the
//! caller and returned alongside results, so tests can assert on them and no
//! state leaks between runs.

use chrono::{DateTime, Utc};

/// Mutable accounting for one workflow run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub started_at: DateTime<Utc>,
    warnings: Vec<String>,
    failures: u32,
}

impl RunContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            warnings: Vec::new(),
            failures: 0,
        }
    }

    /// Record a soft failure. Also emits a warn-level trace event so the
    /// console and log file both carry the reason.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.warnings.push(message);
    }

    /// Record a hard failure of a sub-unit (a database, a step).
    pub fn count_failure(&mut self) {
        self.failures += 1;
    }

    #[must_use]
    pub fn failures(&self) -> u32 {
        self.failures
    }

    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Seconds elapsed since the run started.
    #[must_use]
    pub fn elapsed_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
