//! Step sequencing, the uniform step wrapper, and the final report.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use upr_config::DriverConfig;
use upr_core::artifacts::{tail_lines, timestamped_path};
use upr_core::context::RunContext;
use upr_core::entities::StepRecord;
use upr_core::enums::StepOutcome;
use upr_core::prompt::Prompt;
use upr_core::report::RunReport;
use upr_exec::{CommandOutput, CommandRunner, CommandSpec, run_with_retry};

use crate::error::DriveError;
use crate::remote::{RemoteHost, transfer};
use crate::state::RunState;
use crate::steps::StepId;

/// What discovery found on the source host. Later steps and the final report
/// both read from this.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveredAssets {
    pub nginx_sites: Vec<String>,
    pub uwsgi_inis: Vec<String>,
    pub app_dirs: Vec<String>,
    pub containers: Vec<String>,
    pub volumes: Vec<String>,
    pub crontab: Vec<String>,
    pub systemd_units: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveReport {
    pub started_at: DateTime<Utc>,
    pub steps: Vec<StepRecord>,
    pub discovered: DiscoveredAssets,
    /// `(service, state)` snapshot taken during post-fixups.
    pub service_status: Vec<(String, String)>,
    pub aborted: bool,
    pub warnings: Vec<String>,
}

impl DriveReport {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            steps: Vec::new(),
            discovered: DiscoveredAssets::default(),
            service_status: Vec::new(),
            aborted: false,
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn failed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| step.outcome == StepOutcome::Failed)
            .count()
    }

    /// Non-zero on abort or any failed step.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.aborted {
            2
        } else {
            i32::from(self.failed_steps() > 0)
        }
    }

    #[must_use]
    pub fn summary(&self) -> RunReport {
        let mut report = RunReport::new("Uproot host migration", self.started_at);
        {
            let steps = report.section("Steps");
            for step in &self.steps {
                steps.line(
                    step.name.clone(),
                    format!("{} ({}s)", step.outcome, step.duration.as_secs()),
                );
            }
            if self.aborted {
                steps.note("run aborted by the operator; remaining steps were not attempted");
            }
        }
        {
            let discovery = report.section("Discovered on source");
            discovery
                .line("nginx sites", self.discovered.nginx_sites.len().to_string())
                .line("uwsgi inis", self.discovered.uwsgi_inis.len().to_string())
                .line("containers", self.discovered.containers.len().to_string())
                .line("volumes", self.discovered.volumes.len().to_string())
                .line("crontab lines", self.discovered.crontab.len().to_string())
                .line("systemd units", self.discovered.systemd_units.len().to_string());
            for dir in &self.discovered.app_dirs {
                discovery.note(format!("app: {dir}"));
            }
        }
        {
            let services = report.section("Destination services");
            for (service, state) in &self.service_status {
                services.line(service.clone(), state.clone());
            }
        }
        let warnings = report.section("Warnings");
        for warning in &self.warnings {
            warnings.note(warning.clone());
        }
        report
    }
}

/// Internal step result: combined output on success, failure description
/// (with whatever output there was) on failure.
type StepResult = Result<String, String>;

pub struct MigrationDriver<'a> {
    runner: &'a dyn CommandRunner,
    prompt: &'a dyn Prompt,
    config: &'a DriverConfig,
    source: RemoteHost,
    dest: RemoteHost,
    log_dir: PathBuf,
    state_file: PathBuf,
    resume: bool,
    snapshot: Arc<Mutex<DriveReport>>,
}

impl<'a> MigrationDriver<'a> {
    #[must_use]
    pub fn new(
        runner: &'a dyn CommandRunner,
        prompt: &'a dyn Prompt,
        config: &'a DriverConfig,
        source: RemoteHost,
        dest: RemoteHost,
        log_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            prompt,
            config,
            source,
            dest,
            log_dir: log_dir.into(),
            state_file: PathBuf::from(&config.state_file),
            resume: false,
            snapshot: Arc::new(Mutex::new(DriveReport::new(Utc::now()))),
        }
    }

    /// Live copy of the in-progress report, refreshed after every step. The
    /// CLI writes this out when an interrupt arrives mid-run, so the final
    /// report covers the steps attempted so far even on Ctrl-C.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Mutex<DriveReport>> {
        Arc::clone(&self.snapshot)
    }

    fn publish(&self, report: &DriveReport) {
        if let Ok(mut guard) = self.snapshot.lock() {
            *guard = report.clone();
        }
    }

    #[must_use]
    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = path.into();
        self
    }

    /// Skip steps already marked completed in the state file.
    #[must_use]
    pub const fn resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    /// Run the sequence. The report is returned even when the run aborts;
    /// only state-file corruption is a hard error.
    pub async fn run(&self) -> Result<DriveReport, DriveError> {
        let mut report = DriveReport::new(Utc::now());
        let mut ctx = RunContext::new();
        let mut state = if self.resume {
            RunState::load(&self.state_file)?
        } else {
            RunState::default()
        };
        let total = StepId::ALL.len();

        for (index, step) in StepId::ALL.into_iter().enumerate() {
            let number = index + 1;

            if self.resume && state.is_completed(step) {
                tracing::info!("[{number}/{total}] {step}: completed in a previous run, skipped");
                report.steps.push(StepRecord {
                    name: step.to_string(),
                    description: step.description().to_string(),
                    outcome: StepOutcome::Skipped,
                    duration: Duration::ZERO,
                    log_path: None,
                });
                self.publish(&report);
                continue;
            }

            tracing::info!("[{number}/{total}] {step}: {}", step.description());
            let started = Instant::now();
            let result = self.execute(step, &mut report).await;
            let duration = started.elapsed();

            let log_text = match &result {
                Ok(output) | Err(output) => output.as_str(),
            };
            let log_path = match self.write_step_log(step, log_text) {
                Ok(path) => Some(path),
                Err(error) => {
                    ctx.warn(format!("could not write log for step {step}: {error}"));
                    None
                }
            };

            match result {
                Ok(_) => {
                    tracing::info!("[{number}/{total}] {step}: ok ({}s)", duration.as_secs());
                    state.mark_completed(step);
                    if let Err(error) = state.save(&self.state_file) {
                        ctx.warn(format!("could not persist run state: {error}"));
                    }
                    report.steps.push(StepRecord {
                        name: step.to_string(),
                        description: step.description().to_string(),
                        outcome: StepOutcome::Passed,
                        duration,
                        log_path,
                    });
                    self.publish(&report);
                }
                Err(failure) => {
                    ctx.count_failure();
                    tracing::error!("[{number}/{total}] {step}: FAILED ({}s)", duration.as_secs());
                    for line in tail_lines(&failure, 20).lines() {
                        tracing::error!("    {line}");
                    }
                    report.steps.push(StepRecord {
                        name: step.to_string(),
                        description: step.description().to_string(),
                        outcome: StepOutcome::Failed,
                        duration,
                        log_path,
                    });
                    self.publish(&report);

                    let question = format!("step {step} failed; continue with the remaining steps?");
                    let go_on = match self.prompt.confirm(&question, false) {
                        Ok(answer) => answer,
                        Err(error) => {
                            ctx.warn(format!("cannot ask to continue: {error}"));
                            false
                        }
                    };
                    if !go_on {
                        report.aborted = true;
                        tracing::error!("aborting; {} of {total} steps attempted", number);
                        break;
                    }
                }
            }
        }

        report.warnings = ctx.warnings().to_vec();
        self.publish(&report);
        Ok(report)
    }

    async fn execute(&self, step: StepId, report: &mut DriveReport) -> StepResult {
        match step {
            StepId::Prerequisites => self.check_prerequisites().await,
            StepId::Connectivity => self.check_connectivity().await,
            StepId::Discovery => self.discover(report).await,
            StepId::Backup => self.backup_source_config().await,
            StepId::SyncFiles => self.sync_files(report).await,
            StepId::MigrateNginx => self.migrate_nginx().await,
            StepId::MigrateUwsgi => self.migrate_uwsgi().await,
            StepId::MigrateApps => self.migrate_apps(report).await,
            StepId::MigrateDocker => self.migrate_docker(report).await,
            StepId::MigrateCron => self.migrate_cron().await,
            StepId::MigrateSystemd => self.migrate_systemd(report).await,
            StepId::PostFixups => self.post_fixups(report).await,
        }
    }

    /// Run one command with the configured retry policy. Non-zero exit after
    /// the last attempt becomes a step failure.
    async fn retried(&self, spec: CommandSpec) -> Result<CommandOutput, String> {
        let delay = Duration::from_secs(self.config.remote_retry_delay_secs);
        match run_with_retry(self.runner, &spec, self.config.remote_attempts, delay).await {
            Ok((output, _)) if output.success() => Ok(output),
            Ok((output, attempts)) => Err(format!(
                "`{spec}` failed after {attempts} attempts\n{}",
                output.stderr
            )),
            Err(error) => Err(format!("`{spec}` could not run: {error}")),
        }
    }

    async fn remote(&self, host: &RemoteHost, command: &str) -> Result<CommandOutput, String> {
        self.retried(host.ssh(command)).await
    }

    async fn check_prerequisites(&self) -> StepResult {
        let mut log = String::new();
        for (tool, flag) in [("ssh", "-V"), ("rsync", "--version")] {
            let spec = CommandSpec::new(tool).arg(flag);
            match self.runner.run(&spec).await {
                Ok(output) if output.code.is_some() => {
                    log.push_str(&format!("{tool}: present\n"));
                }
                Ok(_) => return Err(format!("{tool} was killed by a signal")),
                Err(error) => return Err(format!("{tool} is not usable: {error}")),
            }
        }
        Ok(log)
    }

    async fn check_connectivity(&self) -> StepResult {
        self.remote(&self.source, "true").await?;
        self.remote(&self.dest, "true").await?;
        Ok(format!(
            "reachable: {} and {}\n",
            self.source.address(),
            self.dest.address()
        ))
    }

    async fn discover(&self, report: &mut DriveReport) -> StepResult {
        // Every probe tolerates the asset class being absent; `|| true` keeps
        // a missing directory from failing discovery as a whole.
        let sites = self
            .remote(&self.source, "ls -1 /etc/nginx/sites-enabled 2>/dev/null || true")
            .await?;
        let inis = self
            .remote(
                &self.source,
                "find /etc/uwsgi -name '*.ini' 2>/dev/null || true",
            )
            .await?;
        let markers = self
            .remote(
                &self.source,
                "find /srv /var/www -maxdepth 3 \\( -name manage.py -o -name package.json \\) 2>/dev/null || true",
            )
            .await?;
        let containers = self
            .remote(
                &self.source,
                "docker ps -a --format '{{.Names}}' 2>/dev/null || true",
            )
            .await?;
        let volumes = self
            .remote(
                &self.source,
                "docker volume ls --format '{{.Name}}' 2>/dev/null || true",
            )
            .await?;
        let crontab = self
            .remote(&self.source, "crontab -l 2>/dev/null || true")
            .await?;
        let units = self
            .remote(
                &self.source,
                "systemctl list-unit-files --type=service --state=enabled --no-legend 2>/dev/null | awk '{print $1}' || true",
            )
            .await?;

        let owned = |output: &CommandOutput| {
            output
                .stdout_lines()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
        };
        report.discovered.nginx_sites = owned(&sites);
        report.discovered.uwsgi_inis = owned(&inis);
        report.discovered.containers = owned(&containers);
        report.discovered.volumes = owned(&volumes);
        report.discovered.crontab = owned(&crontab);
        report.discovered.systemd_units = owned(&units);

        let mut app_dirs: Vec<String> = markers
            .stdout_lines()
            .iter()
            .filter_map(|marker| {
                Path::new(marker)
                    .parent()
                    .map(|dir| dir.display().to_string())
            })
            .collect();
        app_dirs.dedup();
        report.discovered.app_dirs = app_dirs;

        Ok(format!(
            "sites={} inis={} apps={} containers={} volumes={} cron_lines={} units={}\n",
            report.discovered.nginx_sites.len(),
            report.discovered.uwsgi_inis.len(),
            report.discovered.app_dirs.len(),
            report.discovered.containers.len(),
            report.discovered.volumes.len(),
            report.discovered.crontab.len(),
            report.discovered.systemd_units.len(),
        ))
    }

    async fn backup_source_config(&self) -> StepResult {
        let archive = format!(
            "/var/backups/uproot-pre-migration-{}.tar.gz",
            Utc::now().format("%Y%m%d-%H%M%S")
        );
        let command = format!(
            "mkdir -p /var/backups && tar czf {archive} --ignore-failed-read /etc/nginx /etc/uwsgi /etc/systemd/system"
        );
        self.remote(&self.source, &command).await?;
        Ok(format!("source configuration archived to {archive}\n"))
    }

    async fn sync_files(&self, report: &DriveReport) -> StepResult {
        let defaults = ["/srv".to_string(), "/var/www".to_string()];
        let dirs: &[String] = if report.discovered.app_dirs.is_empty() {
            &defaults
        } else {
            &report.discovered.app_dirs
        };
        let mut log = String::new();
        for dir in dirs {
            self.retried(transfer(&self.source, &self.dest, dir)).await?;
            log.push_str(&format!("synced {dir}\n"));
        }
        Ok(log)
    }

    async fn migrate_nginx(&self) -> StepResult {
        self.remote(&self.dest, "systemctl stop nginx 2>/dev/null || true")
            .await?;
        self.retried(transfer(&self.source, &self.dest, "/etc/nginx"))
            .await?;
        self.remote(&self.dest, "nginx -t").await?;
        self.remote(&self.dest, "systemctl enable --now nginx").await?;
        Ok("nginx configuration moved and server started\n".to_string())
    }

    async fn migrate_uwsgi(&self) -> StepResult {
        self.retried(transfer(&self.source, &self.dest, "/etc/uwsgi"))
            .await?;
        self.remote(
            &self.dest,
            "systemctl daemon-reload && (systemctl restart uwsgi 2>/dev/null || systemctl restart uwsgi-emperor)",
        )
        .await?;
        Ok("uwsgi configuration moved and emperor restarted\n".to_string())
    }

    async fn migrate_apps(&self, report: &DriveReport) -> StepResult {
        if report.discovered.app_dirs.is_empty() {
            return Ok("no application directories discovered\n".to_string());
        }
        let mut log = String::new();
        for dir in &report.discovered.app_dirs {
            self.retried(transfer(&self.source, &self.dest, dir)).await?;
            log.push_str(&format!("app synced: {dir}\n"));
        }
        Ok(log)
    }

    async fn migrate_docker(&self, report: &DriveReport) -> StepResult {
        if report.discovered.containers.is_empty() && report.discovered.volumes.is_empty() {
            return Ok("no containers or volumes discovered\n".to_string());
        }
        let mut log = String::new();
        for name in &report.discovered.containers {
            let archive = format!("/tmp/uproot-image-{name}.tar");
            let save = format!(
                "docker save -o {archive} $(docker inspect --format '{{{{.Config.Image}}}}' {name})"
            );
            self.remote(&self.source, &save).await?;
            self.retried(transfer(&self.source, &self.dest, &archive))
                .await?;
            self.remote(&self.dest, &format!("docker load -i {archive} && rm -f {archive}"))
                .await?;
            self.remote(&self.source, &format!("rm -f {archive}")).await?;
            log.push_str(&format!("image transferred for container {name}\n"));
        }
        // Volume payloads go through a throwaway container so the tar runs
        // against the mounted volume, not the engine's storage internals.
        for volume in &report.discovered.volumes {
            let archive = format!("/tmp/uproot-volume-{volume}.tar.gz");
            let pack = format!(
                "docker run --rm -v {volume}:/volume -v /tmp:/backup alpine tar czf /backup/uproot-volume-{volume}.tar.gz -C /volume ."
            );
            self.remote(&self.source, &pack).await?;
            self.retried(transfer(&self.source, &self.dest, &archive))
                .await?;
            let unpack = format!(
                "docker volume create {volume} && docker run --rm -v {volume}:/volume -v /tmp:/backup alpine tar xzf /backup/uproot-volume-{volume}.tar.gz -C /volume && rm -f {archive}"
            );
            self.remote(&self.dest, &unpack).await?;
            self.remote(&self.source, &format!("rm -f {archive}")).await?;
            log.push_str(&format!("volume transferred: {volume}\n"));
        }
        Ok(log)
    }

    async fn migrate_cron(&self) -> StepResult {
        let crontab = self
            .remote(&self.source, "crontab -l 2>/dev/null || true")
            .await?;
        if crontab.stdout.trim().is_empty() {
            return Ok("source has no crontab\n".to_string());
        }
        self.retried(self.dest.ssh_with_stdin("crontab -", crontab.stdout.clone()))
            .await?;
        Ok(format!(
            "replayed {} crontab lines\n",
            crontab.stdout_lines().len()
        ))
    }

    async fn migrate_systemd(&self, report: &DriveReport) -> StepResult {
        self.retried(transfer(&self.source, &self.dest, "/etc/systemd/system"))
            .await?;
        self.remote(&self.dest, "systemctl daemon-reload").await?;
        let mut log = String::from("unit files moved\n");
        for unit in &report.discovered.systemd_units {
            self.remote(&self.dest, &format!("systemctl enable {unit}"))
                .await?;
            log.push_str(&format!("enabled {unit}\n"));
        }
        Ok(log)
    }

    async fn post_fixups(&self, report: &mut DriveReport) -> StepResult {
        self.remote(&self.dest, "nginx -s reload 2>/dev/null || true")
            .await?;
        let mut log = String::new();
        for service in ["nginx", "uwsgi", "docker", "cron"] {
            let output = self
                .remote(
                    &self.dest,
                    &format!("systemctl is-active {service} 2>/dev/null || true"),
                )
                .await?;
            let state = output
                .stdout_lines()
                .first()
                .map_or_else(|| "unknown".to_string(), ToString::to_string);
            log.push_str(&format!("{service}: {state}\n"));
            report.service_status.push((service.to_string(), state));
        }
        Ok(log)
    }

    fn write_step_log(&self, step: StepId, text: &str) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.log_dir)?;
        let path = timestamped_path(
            &self.log_dir,
            &format!("drive-{step}"),
            "log",
            Utc::now(),
        );
        std::fs::write(&path, text)?;
        Ok(path)
    }
}
