//! Command execution errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    /// The program could not be started at all (not found, permissions).
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing the stdin payload or collecting output failed mid-flight.
    #[error("I/O error while running '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The command exceeded its configured timeout and was killed.
    #[error("'{program}' did not finish within {timeout_secs}s")]
    Timeout { program: String, timeout_secs: u64 },
}
