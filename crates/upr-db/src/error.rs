//! Database migration errors.
//!
//! Only structural preconditions abort the whole run; per-database failures
//! are recorded in the summary and the batch continues.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// A client tool is missing and could not be installed.
    #[error("'{tool}' is not available and could not be installed ({hint})")]
    ToolUnavailable { tool: String, hint: String },

    /// An endpoint refused the trivial authenticated query.
    #[error("Cannot reach PostgreSQL at {host}:{port}: {detail}")]
    Unreachable {
        host: String,
        port: u16,
        detail: String,
    },

    /// Destination server major version is older than the source's
    /// (only checked when `database.version_check` is enabled).
    #[error("Destination server (v{dest}) is older than source (v{src})")]
    VersionMismatch { src: u32, dest: u32 },

    /// "Migrate all" found nothing to migrate.
    #[error("Source server has no user databases to migrate")]
    NothingToMigrate,

    #[error(transparent)]
    Exec(#[from] upr_exec::ExecError),

    #[error(transparent)]
    Core(#[from] upr_core::errors::CoreError),
}
