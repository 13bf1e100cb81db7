//! Broken symlink discovery and positional repair heuristics.

use std::path::{Path, PathBuf};
use std::time::Duration;

use upr_core::entities::SymlinkEntry;
use upr_core::enums::{LinkState, RepairOutcome};
use upr_exec::{CommandRunner, CommandSpec};

use crate::layout::NginxLayout;

/// Recursively scan `root` for symlinks, recording each one's health. A link
/// is broken when its target does not resolve to an existing path.
#[must_use]
pub fn scan(root: &Path) -> Vec<SymlinkEntry> {
    let mut entries = Vec::new();
    walk(root, &mut entries);
    entries
}

fn walk(dir: &Path, entries: &mut Vec<SymlinkEntry>) {
    let Ok(read) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in read.flatten() {
        let path = entry.path();
        let Ok(meta) = path.symlink_metadata() else {
            continue;
        };
        if meta.file_type().is_symlink() {
            let target = std::fs::read_link(&path).unwrap_or_default();
            let state = if path.exists() {
                LinkState::Healthy
            } else {
                LinkState::Broken
            };
            entries.push(SymlinkEntry {
                path,
                target,
                state,
                repair: None,
            });
        } else if meta.is_dir() {
            walk(&path, entries);
        }
    }
}

/// Broken links only.
#[must_use]
pub fn broken(entries: &[SymlinkEntry]) -> Vec<SymlinkEntry> {
    entries
        .iter()
        .filter(|entry| entry.state == LinkState::Broken)
        .cloned()
        .collect()
}

/// Attempt to repair one broken link. Heuristics are positional and tried in
/// a fixed order; the first existing candidate wins. The package-manager
/// reinstall is a last resort and is only credited when the link actually
/// resolves afterwards.
pub async fn repair(
    entry: &SymlinkEntry,
    layout: &NginxLayout,
    runner: &dyn CommandRunner,
    install_timeout: Duration,
) -> RepairOutcome {
    if let Some(candidate) = infer_target(entry, layout) {
        match relink(&entry.path, &candidate) {
            Ok(()) => {
                tracing::info!(
                    link = %entry.path.display(),
                    target = %candidate.display(),
                    "symlink repaired"
                );
                return RepairOutcome::Fixed;
            }
            Err(error) => {
                tracing::warn!(link = %entry.path.display(), %error, "relink failed");
            }
        }
    }

    // Last resort: reinstall the owning package and recheck.
    let spec = CommandSpec::new("apt-get")
        .args(["install", "--reinstall", "-y", "nginx"])
        .timeout(install_timeout);
    if let Err(error) = runner.run(&spec).await {
        tracing::warn!(%error, "package reinstall failed");
    }
    if entry.path.exists() {
        RepairOutcome::Fixed
    } else {
        RepairOutcome::Unfixed
    }
}

/// Positional target inference, keyed on the link's own path.
fn infer_target(entry: &SymlinkEntry, layout: &NginxLayout) -> Option<PathBuf> {
    let parent = entry.path.parent()?;
    let parent_name = parent.file_name()?.to_string_lossy();
    let file_name = entry.path.file_name()?;

    // sites-enabled/foo -> ../sites-available/foo
    if parent_name == "sites-enabled" {
        let sibling = parent.parent()?.join("sites-available").join(file_name);
        if sibling.exists() {
            return Some(sibling);
        }
        return None;
    }

    // modules-enabled/foo.conf -> ../modules-available/foo.conf, the same
    // shape as the sites case.
    if parent_name == "modules-enabled" {
        let sibling = parent.parent()?.join("modules-available").join(file_name);
        if sibling.exists() {
            return Some(sibling);
        }
    }

    // A link living in (or named after) a modules directory: search the
    // candidate module dirs, then the system lib dirs, for the same filename.
    if parent_name.contains("modules") {
        for dir in layout.module_dirs.iter().chain(layout.lib_dirs.iter()) {
            let candidate = dir.join(file_name);
            if candidate.exists() && candidate != entry.path {
                return Some(candidate);
            }
        }
        return None;
    }

    // The main binary symlink.
    if file_name == "nginx" {
        return layout
            .binary_candidates
            .iter()
            .find(|candidate| candidate.is_file() && **candidate != entry.path)
            .cloned();
    }

    None
}

fn relink(link: &Path, target: &Path) -> std::io::Result<()> {
    std::fs::remove_file(link)?;
    std::os::unix::fs::symlink(target, link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use upr_exec::FakeRunner;

    fn broken_link(dir: &Path, name: &str) -> SymlinkEntry {
        let path = dir.join(name);
        let target = PathBuf::from("/nonexistent/old-server/path");
        std::os::unix::fs::symlink(&target, &path).unwrap();
        SymlinkEntry {
            path,
            target,
            state: LinkState::Broken,
            repair: None,
        }
    }

    #[test]
    fn scan_flags_broken_and_healthy_links() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("real.conf"), "ok").unwrap();
        std::os::unix::fs::symlink(
            dir.path().join("real.conf"),
            dir.path().join("healthy.conf"),
        )
        .unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.conf"), dir.path().join("dangling.conf"))
            .unwrap();

        let entries = scan(dir.path());
        assert_eq!(entries.len(), 2);
        assert_eq!(broken(&entries).len(), 1);
        assert_eq!(
            broken(&entries)[0].path.file_name().unwrap(),
            "dangling.conf"
        );
    }

    #[tokio::test]
    async fn sites_enabled_link_repairs_to_available_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let enabled = dir.path().join("sites-enabled");
        let available = dir.path().join("sites-available");
        std::fs::create_dir_all(&enabled).unwrap();
        std::fs::create_dir_all(&available).unwrap();
        std::fs::write(available.join("app.conf"), "server {}\n").unwrap();

        let entry = broken_link(&enabled, "app.conf");
        let runner = FakeRunner::new();
        let outcome = repair(
            &entry,
            &NginxLayout::default(),
            &runner,
            Duration::from_secs(120),
        )
        .await;

        assert_eq!(outcome, RepairOutcome::Fixed);
        assert_eq!(
            std::fs::read_link(&entry.path).unwrap(),
            available.join("app.conf")
        );
        // The deterministic heuristic must win; reinstall is never consulted.
        assert_eq!(runner.calls_for("apt-get"), 0);
    }

    #[tokio::test]
    async fn modules_enabled_link_prefers_the_available_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let enabled = dir.path().join("modules-enabled");
        let available = dir.path().join("modules-available");
        std::fs::create_dir_all(&enabled).unwrap();
        std::fs::create_dir_all(&available).unwrap();
        std::fs::write(
            available.join("50-mod-stream.conf"),
            "load_module modules/ngx_stream_module.so;\n",
        )
        .unwrap();

        let entry = broken_link(&enabled, "50-mod-stream.conf");
        let runner = FakeRunner::new();
        let outcome = repair(
            &entry,
            &NginxLayout::default(),
            &runner,
            Duration::from_secs(120),
        )
        .await;

        assert_eq!(outcome, RepairOutcome::Fixed);
        assert_eq!(
            std::fs::read_link(&entry.path).unwrap(),
            available.join("50-mod-stream.conf")
        );
        assert_eq!(runner.calls_for("apt-get"), 0);
    }

    #[tokio::test]
    async fn module_link_searches_candidate_dirs_by_filename() {
        let dir = tempfile::tempdir().unwrap();
        let modules = dir.path().join("modules");
        let lib = dir.path().join("lib");
        std::fs::create_dir_all(&modules).unwrap();
        std::fs::create_dir_all(&lib).unwrap();
        std::fs::write(lib.join("ngx_http_geoip_module.so"), b"\x7fELF").unwrap();

        let entry = broken_link(&modules, "ngx_http_geoip_module.so");
        let layout = NginxLayout {
            module_dirs: vec![dir.path().join("missing-modules")],
            lib_dirs: vec![lib.clone()],
            ..NginxLayout::default()
        };
        let runner = FakeRunner::new();
        let outcome = repair(&entry, &layout, &runner, Duration::from_secs(120)).await;

        assert_eq!(outcome, RepairOutcome::Fixed);
        assert_eq!(
            std::fs::read_link(&entry.path).unwrap(),
            lib.join("ngx_http_geoip_module.so")
        );
    }

    #[tokio::test]
    async fn unmatched_link_falls_back_to_reinstall_and_reports_unfixed() {
        let dir = tempfile::tempdir().unwrap();
        let entry = broken_link(dir.path(), "mystery.dat");
        let runner = FakeRunner::new();
        let outcome = repair(
            &entry,
            &NginxLayout::default(),
            &runner,
            Duration::from_secs(120),
        )
        .await;

        assert_eq!(outcome, RepairOutcome::Unfixed);
        assert_eq!(runner.calls_for("apt-get"), 1);
    }
}
