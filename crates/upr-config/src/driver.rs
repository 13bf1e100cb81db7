//! Host/service migration driver configuration.

use serde::{Deserialize, Serialize};
use upr_core::prompt::ConfirmPolicy;

const fn default_remote_attempts() -> u32 {
    3
}

const fn default_remote_retry_delay_secs() -> u64 {
    5
}

fn default_state_file() -> String {
    "/var/lib/uproot/drive-state.json".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DriverConfig {
    /// Attempts per remote command before the step sees a failure.
    #[serde(default = "default_remote_attempts")]
    pub remote_attempts: u32,

    /// Fixed delay between remote command attempts.
    #[serde(default = "default_remote_retry_delay_secs")]
    pub remote_retry_delay_secs: u64,

    /// Resumable run state (step name → completion flag) as JSON.
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// Confirmation policy for continuing after a failed step.
    #[serde(default)]
    pub confirm: ConfirmPolicy,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            remote_attempts: default_remote_attempts(),
            remote_retry_delay_secs: default_remote_retry_delay_secs(),
            state_file: default_state_file(),
            confirm: ConfirmPolicy::default(),
        }
    }
}
