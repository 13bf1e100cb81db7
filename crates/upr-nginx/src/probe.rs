//! Binary/config-dir detection and the pre-repair backup.

use std::path::{Path, PathBuf};

use chrono::Utc;
use flate2::Compression;
use flate2::write::GzEncoder;

use crate::error::RepairError;
use crate::layout::NginxLayout;

/// First candidate binary that resolves to an existing file.
pub fn detect_binary(layout: &NginxLayout) -> Result<PathBuf, RepairError> {
    layout
        .binary_candidates
        .iter()
        .find(|candidate| candidate.is_file())
        .cloned()
        .ok_or_else(|| RepairError::BinaryNotFound {
            tried: join_paths(&layout.binary_candidates),
        })
}

/// First prefix that carries an `nginx.conf` entry. A dangling `nginx.conf`
/// symlink still counts as "present" here; resolving it is the repair
/// loop's job, not detection's.
pub fn detect_config_dir(layout: &NginxLayout) -> Result<PathBuf, RepairError> {
    layout
        .config_prefixes
        .iter()
        .find(|prefix| prefix.join("nginx.conf").symlink_metadata().is_ok())
        .cloned()
        .ok_or_else(|| RepairError::ConfigDirNotFound {
            tried: join_paths(&layout.config_prefixes),
        })
}

/// Tar.gz the configuration directory into `backup_dir` before touching
/// anything. Best-effort; the caller downgrades errors to warnings.
pub fn backup_config_dir(config_dir: &Path, backup_dir: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(backup_dir)?;
    let archive_path = upr_core::artifacts::timestamped_path(
        backup_dir,
        "nginx-config-backup",
        "tar.gz",
        Utc::now(),
    );

    let file = std::fs::File::create(&archive_path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    // follow_symlinks(false): the whole point is that some links dangle.
    builder.follow_symlinks(false);
    builder.append_dir_all("nginx", config_dir)?;
    builder.into_inner()?.finish()?;

    Ok(archive_path)
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_binary_picks_first_existing_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let second = dir.path().join("sbin/nginx");
        std::fs::create_dir_all(second.parent().unwrap()).unwrap();
        std::fs::write(&second, b"#!/bin/true").unwrap();

        let layout = NginxLayout {
            binary_candidates: vec![dir.path().join("missing/nginx"), second.clone()],
            ..NginxLayout::default()
        };
        assert_eq!(detect_binary(&layout).unwrap(), second);
    }

    #[test]
    fn detect_config_dir_accepts_dangling_nginx_conf() {
        let dir = tempfile::tempdir().unwrap();
        let conf_dir = dir.path().join("etc/nginx");
        std::fs::create_dir_all(&conf_dir).unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.conf"), conf_dir.join("nginx.conf"))
            .unwrap();

        let layout = NginxLayout::with_prefixes([conf_dir.clone()]);
        assert_eq!(detect_config_dir(&layout).unwrap(), conf_dir);
    }

    #[test]
    fn missing_everything_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let layout = NginxLayout {
            binary_candidates: vec![dir.path().join("nope")],
            config_prefixes: vec![dir.path().join("nope-conf")],
            ..NginxLayout::default()
        };
        assert!(matches!(
            detect_binary(&layout),
            Err(RepairError::BinaryNotFound { .. })
        ));
        assert!(matches!(
            detect_config_dir(&layout),
            Err(RepairError::ConfigDirNotFound { .. })
        ));
    }

    #[test]
    fn backup_writes_timestamped_archive() {
        let dir = tempfile::tempdir().unwrap();
        let conf_dir = dir.path().join("nginx");
        std::fs::create_dir_all(&conf_dir).unwrap();
        std::fs::write(conf_dir.join("nginx.conf"), "events {}\n").unwrap();

        let backup = backup_config_dir(&conf_dir, &dir.path().join("backups")).unwrap();
        assert!(backup.exists());
        assert!(backup.file_name().unwrap().to_string_lossy().ends_with(".tar.gz"));
        assert!(std::fs::metadata(&backup).unwrap().len() > 0);
    }
}
