//! General application configuration.

use serde::{Deserialize, Serialize};

fn default_log_dir() -> String {
    "/var/log/uproot".to_string()
}

fn default_report_dir() -> String {
    "/var/log/uproot/reports".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Directory for per-run log files (timestamped, append-only).
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Directory for run summary reports.
    #[serde(default = "default_report_dir")]
    pub report_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            report_dir: default_report_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = GeneralConfig::default();
        assert_eq!(config.log_dir, "/var/log/uproot");
        assert_eq!(config.report_dir, "/var/log/uproot/reports");
    }
}
