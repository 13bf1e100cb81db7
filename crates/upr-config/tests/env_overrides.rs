//! Environment variables must win over TOML files.

use figment::{
    Figment, Jail,
    providers::{Env, Format, Serialized, Toml},
};
use upr_config::UprConfig;

fn layered() -> Figment {
    Figment::from(Serialized::defaults(UprConfig::default()))
        .merge(Toml::file("config.toml"))
        .merge(Env::prefixed("UPROOT_").split("__"))
}

#[test]
fn env_overrides_toml_value() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[database]
restore_attempts = 5
"#,
        )?;
        jail.set_env("UPROOT_DATABASE__RESTORE_ATTEMPTS", "7");

        let config: UprConfig = layered().extract()?;
        assert_eq!(config.database.restore_attempts, 7);
        Ok(())
    });
}

#[test]
fn env_maps_double_underscore_to_nested_section() {
    Jail::expect_with(|jail| {
        jail.set_env("UPROOT_GENERAL__LOG_DIR", "/srv/logs/uproot");
        jail.set_env("UPROOT_DRIVER__REMOTE_ATTEMPTS", "1");

        let config: UprConfig = layered().extract()?;
        assert_eq!(config.general.log_dir, "/srv/logs/uproot");
        assert_eq!(config.driver.remote_attempts, 1);
        Ok(())
    });
}
