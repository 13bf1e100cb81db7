//! Cross-cutting error types for Uproot.
//!
//! Workflow-specific errors (`DbError`, `RepairError`, `DriveError`) live in
//! their crates; this module only holds what every crate may raise.

use thiserror::Error;

/// Errors that can be raised by any Uproot crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A prompt was required but the injected policy forbids prompting.
    #[error("Confirmation required for '{action}' but no interactive prompt is available")]
    ConfirmationUnavailable { action: String },

    /// An artifact path could not be created or written.
    #[error("Failed to write artifact {path}: {source}")]
    Artifact {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
