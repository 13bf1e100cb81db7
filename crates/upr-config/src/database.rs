//! Database migration configuration.

use serde::{Deserialize, Serialize};
use upr_core::prompt::ConfirmPolicy;

const fn default_restore_attempts() -> u32 {
    3
}

const fn default_retry_delay_secs() -> u64 {
    5
}

const fn default_install_missing_tools() -> bool {
    true
}

const fn default_install_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Restore attempts per database before marking it failed.
    #[serde(default = "default_restore_attempts")]
    pub restore_attempts: u32,

    /// Fixed delay between restore attempts.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Install psql/pg_dump via the package manager when absent.
    #[serde(default = "default_install_missing_tools")]
    pub install_missing_tools: bool,

    /// Bound on package-manager invocations.
    #[serde(default = "default_install_timeout_secs")]
    pub install_timeout_secs: u64,

    /// Refuse to migrate onto a destination server with an older major
    /// version than the source. The two source-script variants disagreed on
    /// this, so it is policy, not code.
    #[serde(default)]
    pub version_check: bool,

    /// Confirmation policy for dropping an existing destination database.
    #[serde(default)]
    pub confirm: ConfirmPolicy,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            restore_attempts: default_restore_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            install_missing_tools: default_install_missing_tools(),
            install_timeout_secs: default_install_timeout_secs(),
            version_check: false,
            confirm: ConfirmPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = DatabaseConfig::default();
        assert_eq!(config.restore_attempts, 3);
        assert_eq!(config.retry_delay_secs, 5);
        assert!(config.install_missing_tools);
        assert_eq!(config.install_timeout_secs, 120);
        assert!(!config.version_check);
        assert_eq!(config.confirm, ConfirmPolicy::Prompt);
    }
}
