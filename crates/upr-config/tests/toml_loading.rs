//! Integration tests for TOML configuration loading.
//!
//! Uses figment::Jail for safe, sandboxed env var manipulation.

use figment::{
    Figment, Jail,
    providers::{Format, Serialized, Toml},
};
use upr_config::UprConfig;
use upr_core::prompt::ConfirmPolicy;

#[test]
fn loads_database_section_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[database]
restore_attempts = 5
retry_delay_secs = 2
install_missing_tools = false
version_check = true
confirm = "always-no"
"#,
        )?;

        let config: UprConfig = Figment::from(Serialized::defaults(UprConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.database.restore_attempts, 5);
        assert_eq!(config.database.retry_delay_secs, 2);
        assert!(!config.database.install_missing_tools);
        assert!(config.database.version_check);
        assert_eq!(config.database.confirm, ConfirmPolicy::AlwaysNo);
        Ok(())
    });
}

#[test]
fn loads_repair_section_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[repair]
nginx_prefixes = ["/opt/nginx/conf"]
max_config_iterations = 3
"#,
        )?;

        let config: UprConfig = Figment::from(Serialized::defaults(UprConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.repair.nginx_prefixes, vec!["/opt/nginx/conf"]);
        assert_eq!(config.repair.max_config_iterations, 3);
        // Untouched section keeps defaults.
        assert_eq!(config.driver.remote_attempts, 3);
        Ok(())
    });
}

#[test]
fn explicit_override_file_wins_over_the_project_file() {
    Jail::expect_with(|jail| {
        jail.create_dir(".uproot")?;
        jail.create_file(
            ".uproot/config.toml",
            r#"
[repair]
max_config_iterations = 3
"#,
        )?;
        jail.create_file(
            "explicit.toml",
            r#"
[repair]
max_config_iterations = 9
"#,
        )?;

        let config =
            UprConfig::load_with_dotenv(Some(std::path::Path::new("explicit.toml")))
                .map_err(|error| figment::Error::from(error.to_string()))?;

        assert_eq!(config.repair.max_config_iterations, 9);
        Ok(())
    });
}

#[test]
fn partial_sections_fall_back_to_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[general]
log_dir = "/tmp/uproot-logs"
"#,
        )?;

        let config: UprConfig = Figment::from(Serialized::defaults(UprConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.general.log_dir, "/tmp/uproot-logs");
        assert_eq!(config.general.report_dir, "/var/log/uproot/reports");
        assert_eq!(config.database.restore_attempts, 3);
        Ok(())
    });
}
