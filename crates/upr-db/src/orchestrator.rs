//! The migration batch orchestrator.
//!
//! Failure semantics: structural problems with the run (tools missing and
//! uninstallable, unreachable endpoints, empty enumeration) abort everything;
//! structural problems with one database (creation failed, empty dump,
//! restore retries exhausted) fail that database and the batch continues;
//! everything else (globals collisions, sequence drift, count mismatches) is
//! a warning on the record.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use upr_config::DatabaseConfig;
use upr_core::context::RunContext;
use upr_core::entities::DatabaseRecord;
use upr_core::enums::DbOutcome;
use upr_core::prompt::Prompt;
use upr_exec::{CommandRunner, ExecError, run_with_retry};

use crate::catalog;
use crate::endpoint::{DbEndpoint, quote_ident, quote_literal};
use crate::error::DbError;
use crate::summary::MigrationSummary;

/// Which databases to migrate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationScope {
    All,
    One(String),
}

pub struct DbMigrator<'a> {
    runner: &'a dyn CommandRunner,
    prompt: &'a dyn Prompt,
    config: &'a DatabaseConfig,
    source: DbEndpoint,
    dest: DbEndpoint,
    /// Override for the dump scratch directory; a fresh `TempDir` per run
    /// when unset.
    dump_dir: Option<PathBuf>,
}

impl<'a> DbMigrator<'a> {
    #[must_use]
    pub fn new(
        runner: &'a dyn CommandRunner,
        prompt: &'a dyn Prompt,
        config: &'a DatabaseConfig,
        source: DbEndpoint,
        dest: DbEndpoint,
    ) -> Self {
        Self {
            runner,
            prompt,
            config,
            source,
            dest,
            dump_dir: None,
        }
    }

    /// Use an existing scratch directory for dump archives (tests, or an
    /// operator-chosen spool volume).
    #[must_use]
    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = Some(dir.into());
        self
    }

    /// Run the whole batch. The returned summary's `exit_code()` is the
    /// number of failed databases.
    pub async fn run(&self, scope: MigrationScope) -> Result<MigrationSummary, DbError> {
        let mut ctx = RunContext::new();

        self.ensure_client_tools().await?;
        self.check_connectivity().await?;
        if self.config.version_check {
            self.check_version_compatibility().await?;
        }

        let names = match scope {
            MigrationScope::One(name) => vec![name],
            MigrationScope::All => {
                let names = catalog::list_databases(self.runner, &self.source).await?;
                if names.is_empty() {
                    return Err(DbError::NothingToMigrate);
                }
                names
            }
        };

        // Scratch space for dump archives; unique per run, removed on drop.
        let mut scratch_guard = None;
        let dump_dir = match &self.dump_dir {
            Some(dir) => dir.clone(),
            None => {
                let tmp = tempfile::TempDir::new().map_err(|source| ExecError::Io {
                    program: "tempdir".to_string(),
                    source,
                })?;
                let path = tmp.path().to_path_buf();
                scratch_guard = Some(tmp);
                path
            }
        };
        let _scratch_guard = scratch_guard;

        tracing::info!(count = names.len(), "starting database migration batch");

        let mut records = Vec::with_capacity(names.len());
        for name in names {
            let record = match self.migrate_database(&name, &dump_dir, &mut ctx).await {
                Ok(record) => record,
                Err(error) => {
                    ctx.warn(format!("{name}: {error}"));
                    DatabaseRecord::failed(&name, error.to_string(), Duration::ZERO)
                }
            };
            if record.outcome == DbOutcome::Failed {
                ctx.count_failure();
            }
            tracing::info!(
                database = %record.name,
                outcome = %record.outcome,
                "database finished"
            );
            records.push(record);
        }

        let summary = MigrationSummary {
            started_at: ctx.started_at,
            records,
        };
        debug_assert_eq!(ctx.failures() as usize, summary.failed());
        tracing::info!(
            databases = summary.records.len(),
            failures = ctx.failures(),
            warnings = ctx.warnings().len(),
            elapsed_secs = ctx.elapsed_secs(),
            "database migration batch finished"
        );
        Ok(summary)
    }

    // ── Preconditions ──────────────────────────────────────────────

    async fn ensure_client_tools(&self) -> Result<(), DbError> {
        for tool in ["psql", "pg_dump", "pg_dumpall", "pg_restore"] {
            if self.tool_present(tool).await {
                continue;
            }
            if !self.config.install_missing_tools {
                return Err(DbError::ToolUnavailable {
                    tool: tool.to_string(),
                    hint: "auto-install disabled; install the postgresql client package".into(),
                });
            }
            tracing::warn!(tool, "client tool missing, attempting package install");
            self.install_client_package().await;
            if !self.tool_present(tool).await {
                return Err(DbError::ToolUnavailable {
                    tool: tool.to_string(),
                    hint: "package install did not provide it; install postgresql-client manually"
                        .into(),
                });
            }
        }
        Ok(())
    }

    async fn tool_present(&self, tool: &str) -> bool {
        let spec = upr_exec::CommandSpec::new(tool).arg("--version");
        matches!(self.runner.run(&spec).await, Ok(output) if output.success())
    }

    /// Best-effort: try the common package managers in order; the recheck in
    /// `ensure_client_tools` decides whether it worked.
    async fn install_client_package(&self) {
        let timeout = Duration::from_secs(self.config.install_timeout_secs);
        let candidates = [
            ("apt-get", vec!["install", "-y", "postgresql-client"]),
            ("yum", vec!["install", "-y", "postgresql"]),
            ("dnf", vec!["install", "-y", "postgresql"]),
        ];
        for (manager, args) in candidates {
            let spec = upr_exec::CommandSpec::new(manager)
                .args(args)
                .timeout(timeout);
            match self.runner.run(&spec).await {
                Ok(output) if output.success() => return,
                Ok(_) | Err(_) => {}
            }
        }
    }

    async fn check_connectivity(&self) -> Result<(), DbError> {
        for endpoint in [&self.source, &self.dest] {
            let (ok, stderr) = catalog::ping(self.runner, endpoint).await?;
            if !ok {
                return Err(DbError::Unreachable {
                    host: endpoint.host.clone(),
                    port: endpoint.port,
                    detail: stderr.trim().to_string(),
                });
            }
        }
        Ok(())
    }

    async fn check_version_compatibility(&self) -> Result<(), DbError> {
        let source = catalog::server_major_version(self.runner, &self.source).await?;
        let dest = catalog::server_major_version(self.runner, &self.dest).await?;
        if let (Some(source), Some(dest)) = (source, dest) {
            if dest < source {
                return Err(DbError::VersionMismatch { src: source, dest });
            }
        }
        Ok(())
    }

    // ── Per-database pipeline ──────────────────────────────────────

    async fn migrate_database(
        &self,
        name: &str,
        dump_dir: &Path,
        ctx: &mut RunContext,
    ) -> Result<DatabaseRecord, DbError> {
        let started = Instant::now();
        let mut warnings = Vec::new();
        let warn = |ctx: &mut RunContext, list: &mut Vec<String>, message: String| {
            ctx.warn(format!("{name}: {message}"));
            list.push(message);
        };

        // 1. Existence + conflict resolution.
        let exists = catalog::database_exists(self.runner, &self.dest, name).await?;
        let mut create_needed = !exists;
        if exists {
            let question =
                format!("Database '{name}' already exists on destination. Drop and recreate it?");
            if self.prompt.confirm(&question, false)? {
                if let Err(reason) = self.drop_database(name).await {
                    return Ok(DatabaseRecord::failed(
                        name,
                        format!("drop failed: {reason}"),
                        started.elapsed(),
                    ));
                }
                create_needed = true;
            } else {
                // Deliberate reuse path: no drop, no recreate.
                warn(
                    ctx,
                    &mut warnings,
                    "destination database kept; restoring into existing database".into(),
                );
            }
        }

        // 2. Creation with source collation settings, template0 base.
        if create_needed && !self.create_database(name, ctx, &mut warnings).await? {
            return Ok(DatabaseRecord::failed(
                name,
                "database creation failed",
                started.elapsed(),
            ));
        }

        // 3. Cluster globals (roles, tablespaces), best-effort.
        if let Err(reason) = self.replay_globals().await {
            warn(ctx, &mut warnings, format!("globals replay failed: {reason}"));
        }

        // 4. Dump. A zero-byte archive is a definitive failure; restore is
        //    never attempted against it.
        let archive = dump_dir.join(format!("{name}.dump"));
        let dump = self.runner.run(&self.source.pg_dump(name, &archive)).await?;
        if !dump.success() {
            remove_archive(&archive);
            return Ok(DatabaseRecord::failed(
                name,
                format!("dump failed: {}", dump.stderr.trim()),
                started.elapsed(),
            ));
        }
        let archive_len = std::fs::metadata(&archive).map(|meta| meta.len()).unwrap_or(0);
        if archive_len == 0 {
            remove_archive(&archive);
            return Ok(DatabaseRecord::failed(
                name,
                "dump produced an empty archive",
                started.elapsed(),
            ));
        }

        // 5. Restore, retried up to the configured bound.
        let restore_spec = self.dest.pg_restore(name, &archive);
        let (restore, attempts) = run_with_retry(
            self.runner,
            &restore_spec,
            self.config.restore_attempts.max(1),
            Duration::from_secs(self.config.retry_delay_secs),
        )
        .await?;
        remove_archive(&archive);
        if !restore.success() {
            return Ok(DatabaseRecord::failed(
                name,
                format!(
                    "restore failed after {attempts} attempts: {}",
                    restore.stderr.trim()
                ),
                started.elapsed(),
            ));
        }
        if !restore.stderr.trim().is_empty() {
            warn(
                ctx,
                &mut warnings,
                "restore reported errors; some statements were skipped".into(),
            );
        }

        // 6. Sequence resync; drift here is an accepted residual.
        self.resync_sequences(name, ctx, &mut warnings).await;

        // 7. Validation, advisory only.
        let source_tables = catalog::table_count(self.runner, &self.source, name).await?;
        let dest_tables = catalog::table_count(self.runner, &self.dest, name).await?;
        match (source_tables, dest_tables) {
            (Some(source), Some(dest)) if source == dest && source > 0 => {}
            (Some(source), Some(dest)) => warn(
                ctx,
                &mut warnings,
                format!("table count mismatch: source {source}, destination {dest}"),
            ),
            _ => warn(
                ctx,
                &mut warnings,
                "table count validation unavailable".into(),
            ),
        }

        Ok(DatabaseRecord {
            name: name.to_string(),
            source_tables,
            dest_tables,
            duration: started.elapsed(),
            outcome: DbOutcome::Succeeded,
            warnings,
        })
    }

    async fn drop_database(&self, name: &str) -> Result<(), String> {
        let terminate = format!(
            "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
             WHERE datname = {} AND pid <> pg_backend_pid()",
            quote_literal(name)
        );
        let output = self
            .runner
            .run(&self.dest.psql("postgres", &terminate))
            .await
            .map_err(|error| error.to_string())?;
        if !output.success() {
            tracing::warn!(database = name, "backend termination reported errors");
        }

        let drop = format!("DROP DATABASE {}", quote_ident(name));
        let output = self
            .runner
            .run(&self.dest.psql("postgres", &drop))
            .await
            .map_err(|error| error.to_string())?;
        if output.success() {
            Ok(())
        } else {
            Err(output.stderr.trim().to_string())
        }
    }

    /// Returns `false` when both the qualified and the fallback create fail.
    async fn create_database(
        &self,
        name: &str,
        ctx: &mut RunContext,
        warnings: &mut Vec<String>,
    ) -> Result<bool, DbError> {
        let settings = catalog::creation_settings(self.runner, &self.source, name).await?;

        if let Some(settings) = settings {
            let create = format!(
                "CREATE DATABASE {} TEMPLATE template0 ENCODING {} LC_COLLATE {} LC_CTYPE {}",
                quote_ident(name),
                quote_literal(&settings.encoding),
                quote_literal(&settings.collate),
                quote_literal(&settings.ctype),
            );
            let output = self.runner.run(&self.dest.psql("postgres", &create)).await?;
            if output.success() {
                return Ok(true);
            }
            // Degraded path, surfaced as a warning; typically an unsupported
            // locale on the destination.
            let message = format!(
                "create with source settings failed ({}); retrying with defaults",
                output.stderr.trim()
            );
            ctx.warn(format!("{name}: {message}"));
            warnings.push(message);
        }

        let fallback = format!("CREATE DATABASE {}", quote_ident(name));
        let output = self.runner.run(&self.dest.psql("postgres", &fallback)).await?;
        Ok(output.success())
    }

    async fn replay_globals(&self) -> Result<(), String> {
        let dump = self
            .runner
            .run(&self.source.pg_dumpall_globals())
            .await
            .map_err(|error| error.to_string())?;
        if !dump.success() {
            return Err(dump.stderr.trim().to_string());
        }

        let existing = catalog::existing_roles(self.runner, &self.dest)
            .await
            .map_err(|error| error.to_string())?;
        let script = catalog::filter_global_sql(&dump.stdout, &existing);
        if script.trim().is_empty() {
            return Ok(());
        }

        let output = self
            .runner
            .run(&self.dest.psql_script("postgres", script))
            .await
            .map_err(|error| error.to_string())?;
        if output.success() {
            Ok(())
        } else {
            Err(output.stderr.trim().to_string())
        }
    }

    async fn resync_sequences(
        &self,
        name: &str,
        ctx: &mut RunContext,
        warnings: &mut Vec<String>,
    ) {
        let sequences = match catalog::owned_sequences(self.runner, &self.dest, name).await {
            Ok(sequences) => sequences,
            Err(error) => {
                let message = format!("sequence enumeration failed: {error}");
                ctx.warn(format!("{name}: {message}"));
                warnings.push(message);
                return;
            }
        };

        for seq in sequences {
            let sql = format!(
                "SELECT setval({}, COALESCE((SELECT MAX({}) FROM {}.{}), 0) + 1, false)",
                quote_literal(&format!("{}.{}", seq.schema, seq.sequence)),
                quote_ident(&seq.column),
                quote_ident(&seq.schema),
                quote_ident(&seq.table),
            );
            match self.runner.run(&self.dest.psql(name, &sql)).await {
                Ok(output) if output.success() => {}
                Ok(output) => {
                    let message = format!(
                        "sequence resync failed for {}.{}: {}",
                        seq.schema,
                        seq.sequence,
                        output.stderr.trim()
                    );
                    ctx.warn(format!("{name}: {message}"));
                    warnings.push(message);
                }
                Err(error) => {
                    let message =
                        format!("sequence resync failed for {}.{}: {error}", seq.schema, seq.sequence);
                    ctx.warn(format!("{name}: {message}"));
                    warnings.push(message);
                }
            }
        }
    }
}

fn remove_archive(path: &Path) {
    if let Err(error) = std::fs::remove_file(path) {
        if error.kind() != std::io::ErrorKind::NotFound {
            tracing::debug!(path = %path.display(), %error, "could not remove dump archive");
        }
    }
}
