//! Catalog queries against a live endpoint.
//!
//! All helpers return parsed values from `psql -tA` output (pipe-separated
//! columns, one row per line).

use std::collections::HashSet;

use upr_exec::CommandRunner;

use crate::endpoint::{DbEndpoint, quote_literal};
use crate::error::DbError;

/// Collation/encoding settings read from the source catalog, replayed on the
/// destination `CREATE DATABASE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationSettings {
    pub encoding: String,
    pub collate: String,
    pub ctype: String,
}

/// A sequence and the column it feeds, for post-restore resync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRef {
    pub schema: String,
    pub sequence: String,
    pub table: String,
    pub column: String,
}

/// Trivial authenticated query; `false` means the endpoint is unusable.
pub async fn ping(runner: &dyn CommandRunner, endpoint: &DbEndpoint) -> Result<(bool, String), DbError> {
    let output = runner.run(&endpoint.psql("postgres", "SELECT 1")).await?;
    Ok((output.success(), output.stderr))
}

/// Server major version, e.g. 16 for "16.4 (Debian ...)".
pub async fn server_major_version(
    runner: &dyn CommandRunner,
    endpoint: &DbEndpoint,
) -> Result<Option<u32>, DbError> {
    let output = runner
        .run(&endpoint.psql("postgres", "SHOW server_version"))
        .await?;
    if !output.success() {
        return Ok(None);
    }
    Ok(output
        .stdout_lines()
        .first()
        .and_then(|line| line.split('.').next())
        .and_then(|major| major.trim().parse().ok()))
}

/// Non-template, non-system databases on the endpoint.
pub async fn list_databases(
    runner: &dyn CommandRunner,
    endpoint: &DbEndpoint,
) -> Result<Vec<String>, DbError> {
    let output = runner
        .run(&endpoint.psql(
            "postgres",
            "SELECT datname FROM pg_database \
             WHERE NOT datistemplate AND datname <> 'postgres' ORDER BY datname",
        ))
        .await?;
    if !output.success() {
        return Err(DbError::Unreachable {
            host: endpoint.host.clone(),
            port: endpoint.port,
            detail: output.stderr.trim().to_string(),
        });
    }
    Ok(output.stdout_lines().iter().map(ToString::to_string).collect())
}

pub async fn database_exists(
    runner: &dyn CommandRunner,
    endpoint: &DbEndpoint,
    name: &str,
) -> Result<bool, DbError> {
    let sql = format!(
        "SELECT 1 FROM pg_database WHERE datname = {}",
        quote_literal(name)
    );
    let output = runner.run(&endpoint.psql("postgres", &sql)).await?;
    Ok(output.success() && !output.stdout_lines().is_empty())
}

/// Read encoding/collation/ctype for `name` from the source catalog.
pub async fn creation_settings(
    runner: &dyn CommandRunner,
    endpoint: &DbEndpoint,
    name: &str,
) -> Result<Option<CreationSettings>, DbError> {
    let sql = format!(
        "SELECT pg_encoding_to_char(encoding), datcollate, datctype \
         FROM pg_database WHERE datname = {}",
        quote_literal(name)
    );
    let output = runner.run(&endpoint.psql("postgres", &sql)).await?;
    if !output.success() {
        return Ok(None);
    }
    Ok(output.stdout_lines().first().and_then(|line| {
        let mut cols = line.split('|');
        Some(CreationSettings {
            encoding: cols.next()?.trim().to_string(),
            collate: cols.next()?.trim().to_string(),
            ctype: cols.next()?.trim().to_string(),
        })
    }))
}

/// Roles already present on the endpoint, for idempotent globals replay.
pub async fn existing_roles(
    runner: &dyn CommandRunner,
    endpoint: &DbEndpoint,
) -> Result<HashSet<String>, DbError> {
    let output = runner
        .run(&endpoint.psql("postgres", "SELECT rolname FROM pg_roles"))
        .await?;
    if !output.success() {
        return Ok(HashSet::new());
    }
    Ok(output.stdout_lines().iter().map(ToString::to_string).collect())
}

/// Base-table count across user schemas, for parity validation.
pub async fn table_count(
    runner: &dyn CommandRunner,
    endpoint: &DbEndpoint,
    database: &str,
) -> Result<Option<u64>, DbError> {
    let output = runner
        .run(&endpoint.psql(
            database,
            "SELECT count(*) FROM information_schema.tables \
             WHERE table_type = 'BASE TABLE' \
             AND table_schema NOT IN ('pg_catalog', 'information_schema')",
        ))
        .await?;
    if !output.success() {
        return Ok(None);
    }
    Ok(output
        .stdout_lines()
        .first()
        .and_then(|line| line.parse().ok()))
}

/// Sequences with their owning column across user schemas.
pub async fn owned_sequences(
    runner: &dyn CommandRunner,
    endpoint: &DbEndpoint,
    database: &str,
) -> Result<Vec<SequenceRef>, DbError> {
    let output = runner
        .run(&endpoint.psql(
            database,
            "SELECT ns.nspname, seq.relname, tab.relname, attr.attname \
             FROM pg_class seq \
             JOIN pg_namespace ns ON ns.oid = seq.relnamespace \
             JOIN pg_depend dep ON dep.objid = seq.oid AND dep.deptype = 'a' \
             JOIN pg_class tab ON tab.oid = dep.refobjid \
             JOIN pg_attribute attr ON attr.attrelid = tab.oid AND attr.attnum = dep.refobjsubid \
             WHERE seq.relkind = 'S' \
             AND ns.nspname NOT IN ('pg_catalog', 'information_schema')",
        ))
        .await?;
    if !output.success() {
        return Ok(Vec::new());
    }
    Ok(output
        .stdout_lines()
        .iter()
        .filter_map(|line| {
            let mut cols = line.split('|');
            Some(SequenceRef {
                schema: cols.next()?.trim().to_string(),
                sequence: cols.next()?.trim().to_string(),
                table: cols.next()?.trim().to_string(),
                column: cols.next()?.trim().to_string(),
            })
        })
        .collect())
}

/// Drop `CREATE ROLE` statements for roles that already exist, so globals
/// replay stays idempotent across reruns.
#[must_use]
pub fn filter_global_sql(dump: &str, existing: &HashSet<String>) -> String {
    dump.lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            if let Some(rest) = trimmed.strip_prefix("CREATE ROLE ") {
                let role = rest.trim_end_matches(';').trim().trim_matches('"');
                return !existing.contains(role);
            }
            true
        })
        .collect::<Vec<_>>()
        .join("\n")
}
