//! Filesystem layout candidates for an nginx installation.
//!
//! Defaults cover Debian/Ubuntu and from-source installs; tests point the
//! whole layout at a temp directory.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct NginxLayout {
    /// Candidate binary paths, probed in order.
    pub binary_candidates: Vec<PathBuf>,
    /// Candidate configuration prefixes, probed in order.
    pub config_prefixes: Vec<PathBuf>,
    /// Directories that may hold dynamic module shared objects.
    pub module_dirs: Vec<PathBuf>,
    /// System library paths searched when a module .so went missing.
    pub lib_dirs: Vec<PathBuf>,
}

impl NginxLayout {
    #[must_use]
    pub fn with_prefixes(prefixes: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            config_prefixes: prefixes.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl Default for NginxLayout {
    fn default() -> Self {
        Self {
            binary_candidates: vec![
                PathBuf::from("/usr/sbin/nginx"),
                PathBuf::from("/usr/local/sbin/nginx"),
                PathBuf::from("/usr/local/nginx/sbin/nginx"),
                PathBuf::from("/sbin/nginx"),
            ],
            config_prefixes: vec![
                PathBuf::from("/etc/nginx"),
                PathBuf::from("/usr/local/nginx/conf"),
            ],
            module_dirs: vec![
                PathBuf::from("/usr/lib/nginx/modules"),
                PathBuf::from("/usr/lib64/nginx/modules"),
                PathBuf::from("/usr/local/nginx/modules"),
            ],
            lib_dirs: vec![
                PathBuf::from("/usr/lib/x86_64-linux-gnu"),
                PathBuf::from("/usr/lib"),
                PathBuf::from("/usr/lib64"),
                PathBuf::from("/usr/local/lib"),
            ],
        }
    }
}
