//! Driver error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("cannot access state file {path}: {source}")]
    State {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path} is not valid JSON: {source}")]
    StateFormat {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Exec(#[from] upr_exec::ExecError),

    #[error(transparent)]
    Core(#[from] upr_core::errors::CoreError),
}
