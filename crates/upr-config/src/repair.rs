//! Nginx repair configuration.

use serde::{Deserialize, Serialize};
use upr_core::prompt::ConfirmPolicy;

fn default_nginx_prefixes() -> Vec<String> {
    vec![
        "/etc/nginx".to_string(),
        "/usr/local/nginx/conf".to_string(),
    ]
}

const fn default_max_config_iterations() -> u32 {
    5
}

const fn default_install_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepairConfig {
    /// Candidate nginx configuration prefixes, probed in order.
    #[serde(default = "default_nginx_prefixes")]
    pub nginx_prefixes: Vec<String>,

    /// Bound on the configuration-test-and-fix loop.
    #[serde(default = "default_max_config_iterations")]
    pub max_config_iterations: u32,

    /// Bound on package-manager invocations.
    #[serde(default = "default_install_timeout_secs")]
    pub install_timeout_secs: u64,

    /// Confirmation policy for the purge-and-reinstall escalation.
    #[serde(default)]
    pub confirm: ConfirmPolicy,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            nginx_prefixes: default_nginx_prefixes(),
            max_config_iterations: default_max_config_iterations(),
            install_timeout_secs: default_install_timeout_secs(),
            confirm: ConfirmPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = RepairConfig::default();
        assert_eq!(config.nginx_prefixes.len(), 2);
        assert_eq!(config.nginx_prefixes[0], "/etc/nginx");
        assert_eq!(config.max_config_iterations, 5);
        assert_eq!(config.install_timeout_secs, 120);
    }
}
