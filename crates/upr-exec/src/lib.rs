//! # upr-exec
//!
//! The single seam between Uproot and the external tools it drives
//! (`psql`, `pg_dump`, `pg_restore`, `ssh`, `rsync`, `nginx`, package
//! managers, `systemctl`, `docker`). Everything goes through the
//! [`CommandRunner`] trait so workflows are testable against the scripted
//! [`FakeRunner`] without a live system.

pub mod error;
pub mod fake;
pub mod retry;
pub mod runner;
pub mod spec;

pub use error::ExecError;
pub use fake::FakeRunner;
pub use retry::run_with_retry;
pub use runner::{CommandRunner, SystemRunner};
pub use spec::{CommandOutput, CommandSpec};
