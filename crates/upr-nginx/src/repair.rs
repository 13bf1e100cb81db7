//! The repair run: detect, back up, scan, repair, iterate, report.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use upr_config::RepairConfig;
use upr_core::entities::{ModuleReference, SymlinkEntry};
use upr_core::enums::{LinkState, ModuleState, RepairOutcome};
use upr_core::prompt::Prompt;
use upr_core::report::RunReport;
use upr_exec::{CommandRunner, CommandSpec};

use crate::diagnose::{Diagnostic, classify};
use crate::error::RepairError;
use crate::layout::NginxLayout;
use crate::{modules, probe, symlinks};

/// Everything a repair run discovered and did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairReport {
    pub started_at: DateTime<Utc>,
    pub binary: PathBuf,
    pub config_dir: PathBuf,
    pub backup: Option<PathBuf>,
    pub symlinks: Vec<SymlinkEntry>,
    pub modules: Vec<ModuleReference>,
    pub compiled_modules: Vec<String>,
    pub loop_iterations: u32,
    pub config_ok: bool,
    pub unresolved: Vec<String>,
    pub warnings: Vec<String>,
    pub escalated: bool,
}

impl RepairReport {
    /// Zero only when the configuration test passes at the end.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        if self.config_ok { 0 } else { 1 }
    }

    #[must_use]
    pub fn broken_links(&self) -> usize {
        self.symlinks
            .iter()
            .filter(|entry| entry.state == LinkState::Broken)
            .count()
    }

    #[must_use]
    pub fn unfixed_links(&self) -> usize {
        self.symlinks
            .iter()
            .filter(|entry| entry.repair == Some(RepairOutcome::Unfixed))
            .count()
    }

    #[must_use]
    pub fn summary(&self) -> RunReport {
        let mut report = RunReport::new("Uproot nginx repair", self.started_at);
        {
            let overview = report.section("Overview");
            overview
                .line("binary", self.binary.display().to_string())
                .line("config dir", self.config_dir.display().to_string())
                .line(
                    "config test",
                    if self.config_ok { "passing" } else { "failing" },
                )
                .line("loop iterations", self.loop_iterations.to_string())
                .line(
                    "broken symlinks",
                    format!("{} ({} unfixed)", self.broken_links(), self.unfixed_links()),
                );
            if let Some(backup) = &self.backup {
                overview.line("config backup", backup.display().to_string());
            }
        }
        {
            let links = report.section("Symlinks");
            for entry in &self.symlinks {
                if entry.state == LinkState::Broken {
                    let outcome = entry
                        .repair
                        .map_or("untouched", RepairOutcome::as_str);
                    links.line(entry.path.display().to_string(), outcome.to_string());
                }
            }
        }
        {
            let mods = report.section("Dynamic modules");
            for module in &self.modules {
                mods.line(module.name.clone(), module.state.to_string());
            }
        }
        let issues = report.section("Unresolved");
        for issue in &self.unresolved {
            issues.note(issue.clone());
        }
        for warning in &self.warnings {
            issues.note(warning.clone());
        }
        report
    }
}

pub struct NginxRepair<'a> {
    runner: &'a dyn CommandRunner,
    prompt: &'a dyn Prompt,
    config: &'a RepairConfig,
    layout: NginxLayout,
    backup_dir: PathBuf,
}

impl<'a> NginxRepair<'a> {
    #[must_use]
    pub fn new(
        runner: &'a dyn CommandRunner,
        prompt: &'a dyn Prompt,
        config: &'a RepairConfig,
        backup_dir: impl Into<PathBuf>,
    ) -> Self {
        let layout = NginxLayout::with_prefixes(
            config.nginx_prefixes.iter().map(PathBuf::from),
        );
        Self {
            runner,
            prompt,
            config,
            layout,
            backup_dir: backup_dir.into(),
        }
    }

    /// Replace the probed filesystem layout (tests, unusual installs).
    #[must_use]
    pub fn with_layout(mut self, layout: NginxLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Run the full repair sequence. Only binary/config-dir detection can
    /// fail; every later stage degrades to warnings.
    pub async fn run(&self) -> Result<RepairReport, RepairError> {
        let started_at = Utc::now();
        let install_timeout = Duration::from_secs(self.config.install_timeout_secs);

        let binary = probe::detect_binary(&self.layout)?;
        let config_dir = probe::detect_config_dir(&self.layout)?;
        tracing::info!(binary = %binary.display(), config_dir = %config_dir.display(), "nginx detected");

        let mut warnings = Vec::new();
        let backup = match probe::backup_config_dir(&config_dir, &self.backup_dir) {
            Ok(path) => Some(path),
            Err(error) => {
                let message = format!("config backup failed: {error}");
                tracing::warn!("{message}");
                warnings.push(message);
                None
            }
        };

        // Symlink scan + repair across the config dir and module dirs.
        let mut symlink_entries = symlinks::scan(&config_dir);
        for dir in &self.layout.module_dirs {
            symlink_entries.extend(symlinks::scan(dir));
        }
        for entry in &mut symlink_entries {
            if entry.state != LinkState::Broken {
                continue;
            }
            let outcome =
                symlinks::repair(entry, &self.layout, self.runner, install_timeout).await;
            if outcome != RepairOutcome::Fixed {
                warnings.push(format!(
                    "symlink {} left {}: consider relinking it manually",
                    entry.path.display(),
                    outcome
                ));
            }
            entry.repair = Some(outcome);
        }

        // Module scan.
        let compiled_modules = match self.runner.run(&CommandSpec::new(binary.display().to_string()).arg("-V")).await {
            Ok(output) => modules::parse_compiled(&format!("{}\n{}", output.stdout, output.stderr)),
            Err(error) => {
                warnings.push(format!("could not read compiled-in modules: {error}"));
                Vec::new()
            }
        };
        let mut module_refs = modules::discover(&config_dir);

        // Module repair: package install first, shared-object symlink second,
        // each followed by a config re-test; a passing test ends the stage.
        for module in &mut module_refs {
            if module.state != ModuleState::Missing {
                continue;
            }
            if modules::try_install(&module.name, self.runner, install_timeout).await {
                if module.expected_path.exists() {
                    module.state = ModuleState::Installed;
                }
                if self.config_test(&binary).await.0 {
                    break;
                }
            }
            if module.state == ModuleState::Missing && modules::try_lib_symlink(module, &self.layout) {
                module.state = ModuleState::Installed;
                if self.config_test(&binary).await.0 {
                    break;
                }
            }
            if module.state == ModuleState::Missing {
                warnings.push(format!(
                    "module {} is still missing; install its package manually (tried: {})",
                    module.name,
                    modules::package_guesses(&module.name).join(", ")
                ));
            }
        }

        // Bounded configuration-test-and-fix loop.
        let mut unresolved = Vec::new();
        let mut loop_iterations = 0;
        let mut config_ok = false;
        while loop_iterations < self.config.max_config_iterations {
            loop_iterations += 1;
            let (ok, stderr) = self.config_test(&binary).await;
            if ok {
                config_ok = true;
                break;
            }
            let outcome = match classify(&stderr) {
                Diagnostic::MissingModuleConf { path } => {
                    let outcome = self.fix_module_conf(&path, install_timeout).await;
                    if outcome == RepairOutcome::Degraded {
                        warnings.push(format!(
                            "placeholder written for {}; module stays unloaded",
                            path.display()
                        ));
                    }
                    outcome
                }
                Diagnostic::MissingFile { path } => {
                    if synthesize_placeholder(&path, None) {
                        warnings.push(format!(
                            "empty placeholder written for missing include {}",
                            path.display()
                        ));
                        RepairOutcome::Degraded
                    } else {
                        RepairOutcome::Unfixed
                    }
                }
                Diagnostic::Unresolved { message } => {
                    unresolved.push(message);
                    RepairOutcome::Unfixed
                }
            };
            if outcome == RepairOutcome::Unfixed {
                // No progress possible; stop before burning the remaining
                // iterations on the same diagnostic.
                break;
            }
        }

        // Final validation.
        if !config_ok {
            let (ok, stderr) = self.config_test(&binary).await;
            config_ok = ok;
            if !ok && !stderr.trim().is_empty() {
                unresolved.push(format!(
                    "configuration test still failing: {}",
                    stderr.lines().next().unwrap_or_default()
                ));
            }
        }

        let mut report = RepairReport {
            started_at,
            binary,
            config_dir,
            backup,
            symlinks: symlink_entries,
            modules: module_refs,
            compiled_modules,
            loop_iterations,
            config_ok,
            unresolved,
            warnings,
            escalated: false,
        };

        self.maybe_escalate(&mut report, install_timeout).await;

        Ok(report)
    }

    /// `nginx -t`; a spawn failure counts as a failing test.
    async fn config_test(&self, binary: &Path) -> (bool, String) {
        let spec = CommandSpec::new(binary.display().to_string()).arg("-t");
        match self.runner.run(&spec).await {
            Ok(output) => (output.success(), output.stderr),
            Err(error) => (false, error.to_string()),
        }
    }

    /// Recover a referenced-but-absent modules-enabled conf file, in order:
    /// modules-available sibling, guessed package, commented-out placeholder.
    /// The placeholder keeps the config loop progressing at the cost of
    /// leaving the module unloaded, hence `Degraded`.
    async fn fix_module_conf(&self, path: &Path, install_timeout: Duration) -> RepairOutcome {
        if let (Some(parent), Some(file_name)) = (path.parent(), path.file_name()) {
            if let Some(grandparent) = parent.parent() {
                let sibling = grandparent.join("modules-available").join(file_name);
                if sibling.exists() {
                    let _ = std::fs::create_dir_all(parent);
                    clear_dangling_link(path);
                    if std::os::unix::fs::symlink(&sibling, path).is_ok() {
                        tracing::info!(conf = %path.display(), "module conf linked from modules-available");
                        return RepairOutcome::Fixed;
                    }
                }
            }
        }

        let module_guess = module_name_from_conf(path);
        if let Some(name) = &module_guess {
            if modules::try_install(name, self.runner, install_timeout).await && path.exists() {
                return RepairOutcome::Fixed;
            }
        }

        if synthesize_placeholder(path, module_guess.as_deref()) {
            RepairOutcome::Degraded
        } else {
            RepairOutcome::Unfixed
        }
    }

    /// When the installation is still substantially broken, offer the
    /// operator a full purge-and-reinstall. Never done without explicit
    /// confirmation.
    async fn maybe_escalate(&self, report: &mut RepairReport, install_timeout: Duration) {
        let binary_broken = !report.binary.is_file();
        let config_missing = !report.config_dir.join("nginx.conf").exists();
        let broken = report.broken_links();
        let majority_unfixed = broken > 0 && report.unfixed_links() * 2 > broken;

        let severity = usize::from(binary_broken)
            + usize::from(config_missing)
            + usize::from(majority_unfixed);
        if severity < 2 {
            return;
        }

        let question = "nginx remains badly broken. Purge and reinstall the nginx packages?";
        let confirmed = match self.prompt.confirm(question, false) {
            Ok(answer) => answer,
            Err(error) => {
                report.warnings.push(format!("escalation skipped: {error}"));
                false
            }
        };
        if !confirmed {
            return;
        }

        for args in [
            vec!["purge", "-y", "nginx", "nginx-common"],
            vec!["install", "-y", "nginx"],
        ] {
            let spec = CommandSpec::new("apt-get").args(args).timeout(install_timeout);
            if let Err(error) = self.runner.run(&spec).await {
                report.warnings.push(format!("reinstall step failed: {error}"));
                return;
            }
        }
        report.escalated = true;
    }
}

/// Write a placeholder conf that keeps the parser happy while leaving the
/// module unloaded. A degraded outcome, not a fix; the comment says so.
fn synthesize_placeholder(path: &Path, module_name: Option<&str>) -> bool {
    if path.exists() {
        return false;
    }
    // A dangling link at the path would make the write chase its target.
    clear_dangling_link(path);
    if let Some(parent) = path.parent() {
        if std::fs::create_dir_all(parent).is_err() {
            return false;
        }
    }
    let body = module_name.map_or_else(
        || "# placeholder written by upr nginx repair; original file was missing\n".to_string(),
        |name| {
            format!(
                "# placeholder written by upr nginx repair; module left unloaded\n# load_module modules/{name}.so;\n"
            )
        },
    );
    match std::fs::write(path, body) {
        Ok(()) => {
            tracing::warn!(conf = %path.display(), "placeholder conf written; module remains unloaded");
            true
        }
        Err(error) => {
            tracing::warn!(conf = %path.display(), %error, "could not write placeholder conf");
            false
        }
    }
}

/// Remove a dangling symlink occupying `path` so a fresh link or file can
/// take its place. Anything that still resolves is left alone.
fn clear_dangling_link(path: &Path) {
    if !path.exists() && path.symlink_metadata().is_ok() {
        let _ = std::fs::remove_file(path);
    }
}

/// `50-mod-http-image-filter.conf` -> `ngx_http_image_filter_module`
fn module_name_from_conf(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    let trimmed = stem.trim_start_matches(|c: char| c.is_ascii_digit() || c == '-');
    let rest = trimmed.strip_prefix("mod-")?;
    Some(format!("ngx_{}_module", rest.replace('-', "_")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn module_name_from_conf_reverses_packaging_convention() {
        assert_eq!(
            module_name_from_conf(Path::new("/etc/nginx/modules-enabled/50-mod-http-image-filter.conf")),
            Some("ngx_http_image_filter_module".to_string())
        );
        assert_eq!(module_name_from_conf(Path::new("random.conf")), None);
    }

    #[test]
    fn placeholder_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modules-enabled/50-mod-stream.conf");
        assert!(synthesize_placeholder(&path, Some("ngx_stream_module")));
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.contains("# load_module modules/ngx_stream_module.so;"));
        // Second call is a no-op: the file now exists.
        assert!(!synthesize_placeholder(&path, None));
    }

    #[test]
    fn placeholder_replaces_a_dangling_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let enabled = dir.path().join("modules-enabled");
        std::fs::create_dir_all(&enabled).unwrap();
        let path = enabled.join("50-mod-stream.conf");
        std::os::unix::fs::symlink("/old-server/etc/nginx/modules-available/50-mod-stream.conf", &path)
            .unwrap();

        assert!(synthesize_placeholder(&path, Some("ngx_stream_module")));
        // The dangling link is gone; a real file sits in its place.
        assert!(!std::fs::symlink_metadata(&path).unwrap().file_type().is_symlink());
        assert!(std::fs::read_to_string(&path).unwrap().contains("# load_module"));
    }

    #[tokio::test]
    async fn module_conf_rung_relinks_over_a_dangling_enabled_link() {
        use upr_core::prompt::ScriptedPrompt;
        use upr_exec::FakeRunner;

        let dir = tempfile::tempdir().unwrap();
        let enabled = dir.path().join("modules-enabled");
        let available = dir.path().join("modules-available");
        std::fs::create_dir_all(&enabled).unwrap();
        std::fs::create_dir_all(&available).unwrap();
        std::fs::write(
            available.join("50-mod-stream.conf"),
            "load_module modules/ngx_stream_module.so;\n",
        )
        .unwrap();
        let path = enabled.join("50-mod-stream.conf");
        std::os::unix::fs::symlink("/old-server/etc/nginx/modules-available/50-mod-stream.conf", &path)
            .unwrap();

        let runner = FakeRunner::new();
        let prompt = ScriptedPrompt::new([]);
        let config = RepairConfig::default();
        let repair = NginxRepair::new(&runner, &prompt, &config, dir.path().join("backups"));
        let outcome = repair
            .fix_module_conf(&path, Duration::from_secs(5))
            .await;

        assert_eq!(outcome, RepairOutcome::Fixed);
        assert_eq!(
            std::fs::read_link(&path).unwrap(),
            available.join("50-mod-stream.conf")
        );
        assert_eq!(runner.calls_for("apt-get"), 0);
    }
}
