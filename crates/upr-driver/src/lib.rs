//! # upr-driver
//!
//! Sequences the host/service migration: a fixed list of named steps
//! (prerequisites, connectivity, discovery, backup, per-subsystem migration,
//! post-fixups), each wrapped uniformly so a failure is visible, logged, and
//! put to the operator as an explicit continue/abort choice.
//!
//! The driver never retries a step; retries live inside the remote command
//! executor. ssh and rsync are black boxes reached through
//! [`upr_exec::CommandRunner`].

pub mod driver;
pub mod error;
pub mod remote;
pub mod state;
pub mod steps;

pub use driver::{DiscoveredAssets, DriveReport, MigrationDriver};
pub use error::DriveError;
pub use remote::RemoteHost;
pub use state::RunState;
pub use steps::StepId;
