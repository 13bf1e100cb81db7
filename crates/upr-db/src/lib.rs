//! # upr-db
//!
//! The database migration orchestrator: enumerates databases on a source
//! PostgreSQL server, dumps each one, recreates it on the destination
//! (collation/encoding preserved, `template0` base), restores it with bounded
//! retries, resynchronizes sequences, and validates table parity.
//!
//! The PostgreSQL client tools (`psql`, `pg_dump`, `pg_dumpall`,
//! `pg_restore`) are black boxes driven through [`upr_exec::CommandRunner`];
//! credentials travel only in per-invocation `PGPASSWORD` environment
//! variables, never on argv or disk.

pub mod catalog;
pub mod endpoint;
pub mod error;
pub mod orchestrator;
pub mod summary;

pub use endpoint::DbEndpoint;
pub use error::DbError;
pub use orchestrator::{DbMigrator, MigrationScope};
pub use summary::MigrationSummary;
