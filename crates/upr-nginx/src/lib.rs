//! # upr-nginx
//!
//! Brings a possibly-broken nginx installation back to a passing
//! configuration test after a host migration: repairs dangling symlinks
//! (sites-enabled, modules, the binary link), resolves missing dynamic
//! modules, and iterates a bounded configuration-test-and-fix loop.
//!
//! Every repair stage is best-effort and isolated; the only fatal conditions
//! are a missing binary and a missing configuration directory.

pub mod diagnose;
pub mod error;
pub mod layout;
pub mod modules;
pub mod probe;
pub mod repair;
pub mod symlinks;

pub use error::RepairError;
pub use layout::NginxLayout;
pub use repair::{NginxRepair, RepairReport};
