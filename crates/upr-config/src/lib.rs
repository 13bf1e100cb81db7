//! # upr-config
//!
//! Figment-layered configuration for Uproot.
//!
//! Providers, lowest to highest precedence: built-in defaults, the
//! user-global `~/.config/uproot/config.toml`, a project-local
//! `.uproot/config.toml`, then `UPROOT_*` environment variables. An explicit
//! `--config` file tops the whole chain.
//!
//! Env vars use `__` between section and key, so
//! `UPROOT_DATABASE__RESTORE_ATTEMPTS=5` sets `database.restore_attempts`.

mod database;
mod driver;
mod error;
mod general;
mod repair;

pub use database::DatabaseConfig;
pub use driver::DriverConfig;
pub use error::ConfigError;
pub use general::GeneralConfig;
pub use repair::RepairConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UprConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub repair: RepairConfig,
    #[serde(default)]
    pub driver: DriverConfig,
}

impl UprConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy` -- use [`UprConfig::load_with_dotenv`] if `.env`
    /// loading is wanted.
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// Load configuration with `.env` file support. Typical entry point for
    /// the CLI. An explicit `override_file` (the `--config` flag) is layered
    /// on top of every other source.
    pub fn load_with_dotenv(override_file: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let mut figment = Self::figment();
        if let Some(path) = override_file {
            figment = figment.merge(Toml::file(path));
        }
        figment.extract().map_err(ConfigError::from)
    }

    /// Build the figment provider chain. Public so tests can layer extra
    /// providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from(".uproot/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("UPROOT_").split("__"))
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("uproot").join("config.toml"))
    }
}
