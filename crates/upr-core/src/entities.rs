//! Record entities produced by the three workflows.
//!
//! Every record is write-once per run: created during enumeration or step
//! start, finalized exactly once, and never mutated afterwards. Persistence
//! is limited to the run report and log files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::enums::{DbOutcome, LinkState, ModuleState, RepairOutcome, StepOutcome};

/// Per-database migration record, finalized after validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseRecord {
    pub name: String,
    pub source_tables: Option<u64>,
    pub dest_tables: Option<u64>,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    pub outcome: DbOutcome,
    pub warnings: Vec<String>,
}

impl DatabaseRecord {
    #[must_use]
    pub fn failed(name: impl Into<String>, reason: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            source_tables: None,
            dest_tables: None,
            duration,
            outcome: DbOutcome::Failed,
            warnings: vec![reason.into()],
        }
    }

    /// Table counts agree and are non-zero.
    #[must_use]
    pub fn counts_match(&self) -> bool {
        matches!(
            (self.source_tables, self.dest_tables),
            (Some(source), Some(dest)) if source == dest && source > 0
        )
    }
}

/// A symlink discovered during the repair scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymlinkEntry {
    /// Path of the link itself.
    pub path: PathBuf,
    /// Target text as recorded on disk (possibly dangling).
    pub target: PathBuf,
    pub state: LinkState,
    /// Set once a repair was attempted; `None` for healthy links.
    pub repair: Option<RepairOutcome>,
}

/// A dynamic module referenced by the web server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleReference {
    /// Module name as it appears in the load directive (e.g. `ngx_http_image_filter_module`).
    pub name: String,
    /// Path the configuration expects the shared object at.
    pub expected_path: PathBuf,
    pub state: ModuleState,
}

/// One driver step, finalized when its footer is printed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepRecord {
    pub name: String,
    pub description: String,
    pub outcome: StepOutcome,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    /// Per-step log file holding the step's combined output.
    pub log_path: Option<PathBuf>,
}

/// Serialize `Duration` as whole seconds; sub-second precision is noise in
/// reports about multi-minute dump/restore runs.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
