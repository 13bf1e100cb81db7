//! Classification of configuration-test diagnostics.
//!
//! `nginx -t` reports problems as human-readable text. Scraping that text is
//! inherently fragile, so the contract here is narrow: an ordered list of
//! pattern matchers, each mapping to one known remediation. Anything
//! unmatched is `Unresolved`, never guessed at.

use std::path::PathBuf;

/// A remediation category derived from one diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A modules-enabled conf file referenced by an include is absent.
    MissingModuleConf { path: PathBuf },
    /// Some other included file is absent.
    MissingFile { path: PathBuf },
    /// Not a pattern we know how to fix.
    Unresolved { message: String },
}

/// Classify the stderr of a failed configuration test. Matchers run in
/// order; the first hit wins.
#[must_use]
pub fn classify(stderr: &str) -> Diagnostic {
    // Pattern 1+2: open() "<path>" failed (2: No such file or directory)
    if let Some(path) = failed_open_path(stderr) {
        if path.to_string_lossy().contains("modules-enabled") {
            return Diagnostic::MissingModuleConf { path };
        }
        if stderr.contains("No such file or directory") {
            return Diagnostic::MissingFile { path };
        }
    }

    Diagnostic::Unresolved {
        message: stderr.lines().next().unwrap_or("unknown error").to_string(),
    }
}

/// Extract the quoted path from an `open() "<path>" failed` diagnostic.
fn failed_open_path(stderr: &str) -> Option<PathBuf> {
    let start = stderr.find("open() \"")? + "open() \"".len();
    let rest = &stderr[start..];
    let end = rest.find('"')?;
    let candidate = &rest[..end];
    rest[end..].starts_with("\" failed").then(|| PathBuf::from(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_modules_enabled_conf_is_recognized() {
        let stderr = "nginx: [emerg] open() \"/etc/nginx/modules-enabled/50-mod-http-image-filter.conf\" failed (2: No such file or directory)\nnginx: configuration file /etc/nginx/nginx.conf test failed";
        assert_eq!(
            classify(stderr),
            Diagnostic::MissingModuleConf {
                path: PathBuf::from("/etc/nginx/modules-enabled/50-mod-http-image-filter.conf")
            }
        );
    }

    #[test]
    fn other_missing_file_maps_to_missing_file() {
        let stderr = "nginx: [emerg] open() \"/etc/nginx/conf.d/upstream.conf\" failed (2: No such file or directory)";
        assert_eq!(
            classify(stderr),
            Diagnostic::MissingFile {
                path: PathBuf::from("/etc/nginx/conf.d/upstream.conf")
            }
        );
    }

    #[test]
    fn unknown_diagnostics_stay_unresolved() {
        let stderr = "nginx: [emerg] unknown directive \"image_filter\" in /etc/nginx/sites-enabled/app.conf:14";
        let Diagnostic::Unresolved { message } = classify(stderr) else {
            panic!("expected Unresolved");
        };
        assert!(message.contains("unknown directive"));
    }

    #[test]
    fn permission_failures_are_not_treated_as_missing_files() {
        let stderr = "nginx: [emerg] open() \"/etc/nginx/secret.conf\" failed (13: Permission denied)";
        assert!(matches!(classify(stderr), Diagnostic::Unresolved { .. }));
    }
}
