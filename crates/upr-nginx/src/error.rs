//! Repair errors. Only the two detection stages are fatal.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepairError {
    /// No usable nginx binary at any candidate path.
    #[error("No nginx binary found (tried: {tried}); install nginx or pass its path")]
    BinaryNotFound { tried: String },

    /// No configuration directory containing nginx.conf.
    #[error("No nginx configuration directory found (tried: {tried})")]
    ConfigDirNotFound { tried: String },

    #[error(transparent)]
    Exec(#[from] upr_exec::ExecError),

    #[error(transparent)]
    Core(#[from] upr_core::errors::CoreError),
}
