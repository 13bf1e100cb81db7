//! Resumable run state.
//!
//! After every completed step the driver persists a step-to-flag map as JSON.
//! A `--resume` run loads it and skips the steps already marked done; a fresh
//! run starts from an empty map and overwrites the file as it goes.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DriveError;
use crate::steps::StepId;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    completed: BTreeMap<StepId, bool>,
}

impl RunState {
    /// Load from `path`; a missing file is an empty state, not an error.
    pub fn load(path: &Path) -> Result<Self, DriveError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(DriveError::State {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        serde_json::from_str(&text).map_err(|source| DriveError::StateFormat {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), DriveError> {
        let state_error = |source| DriveError::State {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(state_error)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| {
            DriveError::StateFormat {
                path: path.display().to_string(),
                source,
            }
        })?;
        std::fs::write(path, json).map_err(state_error)
    }

    pub fn mark_completed(&mut self, step: StepId) {
        self.completed.insert(step, true);
    }

    #[must_use]
    pub fn is_completed(&self, step: StepId) -> bool {
        self.completed.get(&step).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_loads_as_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = RunState::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(state, RunState::default());
        assert!(!state.is_completed(StepId::Backup));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/drive-state.json");

        let mut state = RunState::default();
        state.mark_completed(StepId::Prerequisites);
        state.mark_completed(StepId::Connectivity);
        state.save(&path).unwrap();

        let loaded = RunState::load(&path).unwrap();
        assert!(loaded.is_completed(StepId::Connectivity));
        assert!(!loaded.is_completed(StepId::Discovery));

        // Step keys are stored under their snake_case names.
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"prerequisites\": true"));
    }

    #[test]
    fn garbage_state_file_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drive-state.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            RunState::load(&path),
            Err(DriveError::StateFormat { .. })
        ));
    }
}
