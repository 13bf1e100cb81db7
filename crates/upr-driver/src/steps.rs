//! The fixed migration step sequence.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One named step of the host/service migration, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    Prerequisites,
    Connectivity,
    Discovery,
    Backup,
    SyncFiles,
    MigrateNginx,
    MigrateUwsgi,
    MigrateApps,
    MigrateDocker,
    MigrateCron,
    MigrateSystemd,
    PostFixups,
}

impl StepId {
    /// Execution order. The driver iterates this and nothing else.
    pub const ALL: [Self; 12] = [
        Self::Prerequisites,
        Self::Connectivity,
        Self::Discovery,
        Self::Backup,
        Self::SyncFiles,
        Self::MigrateNginx,
        Self::MigrateUwsgi,
        Self::MigrateApps,
        Self::MigrateDocker,
        Self::MigrateCron,
        Self::MigrateSystemd,
        Self::PostFixups,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prerequisites => "prerequisites",
            Self::Connectivity => "connectivity",
            Self::Discovery => "discovery",
            Self::Backup => "backup",
            Self::SyncFiles => "sync_files",
            Self::MigrateNginx => "migrate_nginx",
            Self::MigrateUwsgi => "migrate_uwsgi",
            Self::MigrateApps => "migrate_apps",
            Self::MigrateDocker => "migrate_docker",
            Self::MigrateCron => "migrate_cron",
            Self::MigrateSystemd => "migrate_systemd",
            Self::PostFixups => "post_fixups",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Prerequisites => "check local tooling (ssh, rsync)",
            Self::Connectivity => "verify ssh access to source and destination",
            Self::Discovery => "enumerate sites, apps, containers, cron and units on the source",
            Self::Backup => "archive pre-migration configuration on the source",
            Self::SyncFiles => "sync application file trees to the destination",
            Self::MigrateNginx => "move the nginx configuration and bring the server up",
            Self::MigrateUwsgi => "move the uwsgi configuration and restart the emperor",
            Self::MigrateApps => "sync discovered application directories",
            Self::MigrateDocker => "transfer container images",
            Self::MigrateCron => "replay the source crontab on the destination",
            Self::MigrateSystemd => "move unit files and re-enable services",
            Self::PostFixups => "final reloads and service status snapshot",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn order_starts_with_checks_and_ends_with_fixups() {
        assert_eq!(StepId::ALL[0], StepId::Prerequisites);
        assert_eq!(StepId::ALL[1], StepId::Connectivity);
        assert_eq!(StepId::ALL[11], StepId::PostFixups);
        assert_eq!(StepId::ALL.len(), 12);
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&StepId::SyncFiles).unwrap(),
            "\"sync_files\""
        );
        assert_eq!(
            serde_json::from_str::<StepId>("\"migrate_nginx\"").unwrap(),
            StepId::MigrateNginx
        );
    }
}
