//! Dynamic module discovery and recovery.

use std::path::{Path, PathBuf};
use std::time::Duration;

use upr_core::entities::ModuleReference;
use upr_core::enums::ModuleState;
use upr_exec::{CommandRunner, CommandSpec};

use crate::layout::NginxLayout;

/// Modules referenced by the main configuration: direct `load_module`
/// directives plus every conf under a wildcard modules-enabled include.
#[must_use]
pub fn discover(config_dir: &Path) -> Vec<ModuleReference> {
    let main_conf = config_dir.join("nginx.conf");
    let Ok(text) = std::fs::read_to_string(&main_conf) else {
        return Vec::new();
    };

    let mut refs = parse_load_modules(&text, config_dir);

    if let Some(include_dir) = modules_enabled_dir(&text, config_dir) {
        if let Ok(read) = std::fs::read_dir(&include_dir) {
            for entry in read.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "conf") {
                    if let Ok(conf_text) = std::fs::read_to_string(&path) {
                        refs.extend(parse_load_modules(&conf_text, config_dir));
                    }
                }
            }
        }
    }

    refs
}

/// Parse `load_module <path>;` directives. Relative paths resolve against
/// the configuration prefix, as nginx itself does.
#[must_use]
pub fn parse_load_modules(conf_text: &str, config_dir: &Path) -> Vec<ModuleReference> {
    conf_text
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            let rest = trimmed.strip_prefix("load_module")?;
            let raw = rest.trim().trim_end_matches(';').trim_matches('"');
            if raw.is_empty() {
                return None;
            }
            let expected_path = if raw.starts_with('/') {
                PathBuf::from(raw)
            } else {
                config_dir.join(raw)
            };
            let name = expected_path.file_stem()?.to_string_lossy().to_string();
            let state = if expected_path.exists() {
                ModuleState::Found
            } else {
                ModuleState::Missing
            };
            Some(ModuleReference {
                name,
                expected_path,
                state,
            })
        })
        .collect()
}

/// The directory of a wildcard `include .../modules-enabled/*.conf;` line.
#[must_use]
pub fn modules_enabled_dir(conf_text: &str, config_dir: &Path) -> Option<PathBuf> {
    conf_text.lines().find_map(|line| {
        let trimmed = line.trim();
        let rest = trimmed.strip_prefix("include")?;
        let raw = rest.trim().trim_end_matches(';');
        if !raw.contains("modules-enabled") {
            return None;
        }
        let dir_part = raw.trim_end_matches("/*.conf").trim_end_matches("/*");
        let path = if dir_part.starts_with('/') {
            PathBuf::from(dir_part)
        } else {
            config_dir.join(dir_part)
        };
        Some(path)
    })
}

/// Compiled-in modules from the `--with-*` flags of `nginx -V` output.
#[must_use]
pub fn parse_compiled(version_output: &str) -> Vec<String> {
    version_output
        .split_whitespace()
        .filter_map(|token| token.strip_prefix("--with-"))
        .filter(|token| token.contains("module"))
        .map(|token| token.trim_end_matches("_module").to_string())
        .collect()
}

/// Package name guesses for a module, most-likely first.
/// `ngx_http_image_filter_module` -> `libnginx-mod-http-image-filter`, ...
#[must_use]
pub fn package_guesses(module_name: &str) -> Vec<String> {
    let stem = module_name.strip_prefix("ngx_").unwrap_or(module_name);
    let stem = stem.strip_suffix("_module").unwrap_or(stem);
    let stem = stem.replace('_', "-");
    vec![
        format!("libnginx-mod-{stem}"),
        format!("nginx-mod-{stem}"),
        format!("nginx-module-{stem}"),
    ]
}

/// Try the guessed packages in order; `true` as soon as one install exits
/// zero. The caller re-runs the configuration test to judge whether the
/// install actually resolved the module.
pub async fn try_install(
    module_name: &str,
    runner: &dyn CommandRunner,
    timeout: Duration,
) -> bool {
    for package in package_guesses(module_name) {
        let spec = CommandSpec::new("apt-get")
            .args(["install", "-y", &package])
            .timeout(timeout);
        match runner.run(&spec).await {
            Ok(output) if output.success() => {
                tracing::info!(module = module_name, package, "module package installed");
                return true;
            }
            Ok(_) | Err(_) => {}
        }
    }
    false
}

/// Search the system lib dirs for the module's shared object and symlink it
/// into the expected location.
#[must_use]
pub fn try_lib_symlink(module: &ModuleReference, layout: &NginxLayout) -> bool {
    let Some(file_name) = module.expected_path.file_name() else {
        return false;
    };
    for dir in &layout.lib_dirs {
        let candidate = dir.join(file_name);
        if candidate.exists() {
            if let Some(parent) = module.expected_path.parent() {
                if std::fs::create_dir_all(parent).is_err() {
                    return false;
                }
            }
            if std::os::unix::fs::symlink(&candidate, &module.expected_path).is_ok() {
                tracing::info!(
                    module = %module.name,
                    from = %candidate.display(),
                    "module shared object symlinked"
                );
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_load_modules_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let text = "load_module modules/ngx_http_geoip_module.so;\nload_module \"/usr/lib/nginx/modules/ngx_stream_module.so\";\n";
        let refs = parse_load_modules(text, dir.path());
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].name, "ngx_http_geoip_module");
        assert_eq!(
            refs[0].expected_path,
            dir.path().join("modules/ngx_http_geoip_module.so")
        );
        assert_eq!(refs[0].state, ModuleState::Missing);
        assert_eq!(
            refs[1].expected_path,
            PathBuf::from("/usr/lib/nginx/modules/ngx_stream_module.so")
        );
    }

    #[test]
    fn discover_walks_modules_enabled_include() {
        let dir = tempfile::tempdir().unwrap();
        let enabled = dir.path().join("modules-enabled");
        std::fs::create_dir_all(&enabled).unwrap();
        std::fs::write(
            dir.path().join("nginx.conf"),
            "include modules-enabled/*.conf;\nevents {}\n",
        )
        .unwrap();
        std::fs::write(
            enabled.join("50-mod-stream.conf"),
            "load_module modules/ngx_stream_module.so;\n",
        )
        .unwrap();

        let refs = discover(dir.path());
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "ngx_stream_module");
    }

    #[test]
    fn parse_compiled_extracts_with_flags() {
        let output = "nginx version: nginx/1.24.0\nconfigure arguments: --with-http_ssl_module --with-http_v2_module --with-cc-opt='-g'";
        let compiled = parse_compiled(output);
        assert_eq!(compiled, vec!["http_ssl", "http_v2"]);
    }

    #[rstest::rstest]
    #[case("ngx_http_image_filter_module", "http-image-filter")]
    #[case("ngx_stream_module", "stream")]
    #[case("http_geoip", "http-geoip")]
    fn package_guesses_follow_distro_conventions(#[case] module: &str, #[case] stem: &str) {
        assert_eq!(
            package_guesses(module),
            vec![
                format!("libnginx-mod-{stem}"),
                format!("nginx-mod-{stem}"),
                format!("nginx-module-{stem}"),
            ]
        );
    }

    #[test]
    fn lib_symlink_places_module_at_expected_path() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib");
        std::fs::create_dir_all(&lib).unwrap();
        std::fs::write(lib.join("ngx_http_geoip_module.so"), b"\x7fELF").unwrap();

        let module = ModuleReference {
            name: "ngx_http_geoip_module".into(),
            expected_path: dir.path().join("modules/ngx_http_geoip_module.so"),
            state: ModuleState::Missing,
        };
        let layout = NginxLayout {
            lib_dirs: vec![lib],
            ..NginxLayout::default()
        };
        assert!(try_lib_symlink(&module, &layout));
        assert!(module.expected_path.exists());
    }
}
