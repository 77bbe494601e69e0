//! # Backup & Idempotency Guard
//!
//! Snapshots every artifact before its first modification so the merge can
//! be undone and re-applied from a pristine state.
//!
//! Snapshots live under `<project>/plugins/<plugin-id>/backup/<platform>/<file>`.
//! A snapshot represents the file as it was before the tool ever touched it:
//! once written it is never overwritten by the merge path, only removed by an
//! explicit clean after a restore.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::Level;

use crate::error::Result;
use crate::manifest::Manifest;
use crate::platform::{self, Artifact};

/// Plugin id used when none is given.
pub const DEFAULT_PLUGIN_ID: &str = "cordova-custom-config";

/// Snapshot store plus the per-run set of artifacts already reported as
/// modified.
#[derive(Debug)]
pub struct BackupGuard {
    root: PathBuf,
    touched: HashSet<PathBuf>,
}

impl BackupGuard {
    pub fn new(project_root: &Path, plugin_id: &str) -> Self {
        Self {
            root: project_root.join("plugins").join(plugin_id).join("backup"),
            touched: HashSet::new(),
        }
    }

    /// `<project>/plugins/<plugin-id>/backup`.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snapshot_path(&self, platform: &str, backup_name: &str) -> PathBuf {
        self.root.join(platform).join(backup_name)
    }

    pub fn has_snapshot(&self, platform: &str, backup_name: &str) -> bool {
        self.snapshot_path(platform, backup_name).is_file()
    }

    /// Snapshot `artifact_path` unless a snapshot already exists.
    ///
    /// Logs the "applied" notice the first time a path is seen in this run.
    /// Returns `true` when a new snapshot was written.
    pub fn ensure_backup(
        &mut self,
        artifact_path: &Path,
        platform: &str,
        backup_name: &str,
    ) -> Result<bool> {
        let platform_dir = self.root.join(platform);
        if !platform_dir.is_dir() {
            fs::create_dir_all(&platform_dir)?;
            log::debug!("Created backup directory: {}", platform_dir.display());
        }

        let snapshot = platform_dir.join(backup_name);
        let created = if snapshot.is_file() {
            log::debug!(
                "Backup exists for '{}' at: {}",
                backup_name,
                snapshot.display()
            );
            false
        } else {
            fs::copy(artifact_path, &snapshot)?;
            log::debug!(
                "Backed up {} to {}",
                artifact_path.display(),
                snapshot.display()
            );
            true
        };

        if self.touched.insert(artifact_path.to_path_buf()) {
            log::info!(
                "Applied custom config from config.xml to {}",
                artifact_path.display()
            );
        }
        Ok(created)
    }

    /// Whether `path` has been reported as modified in this run.
    #[cfg(test)]
    pub(crate) fn was_touched(&self, path: &Path) -> bool {
        self.touched.contains(path)
    }

    /// Copy every snapshot of `platform` back over its live artifact.
    ///
    /// Returns the artifacts that were restored. `level` is the severity
    /// used for the per-file notice.
    pub fn restore_platform(
        &self,
        project_root: &Path,
        manifest: &Manifest,
        platform: &str,
        level: Level,
    ) -> Result<Vec<Artifact>> {
        log::debug!("Checking to see if there are backups to restore...");
        let platform_dir = platform::platform_dir(project_root, platform);
        let mut restored = Vec::new();

        for artifact in Artifact::restorable(platform) {
            let backup_name = artifact.backup_name(manifest)?;
            let snapshot = self.snapshot_path(platform, &backup_name);
            if !snapshot.is_file() {
                continue;
            }
            let target = artifact.live_path(&platform_dir, manifest)?;
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&snapshot, &target)?;
            log::log!(
                level,
                "Restored backup of '{}' to: {}",
                backup_name,
                target.display()
            );
            restored.push(artifact);
        }
        Ok(restored)
    }

    /// Delete the snapshots of `platform`.
    pub fn clean_platform(&self, platform: &str) -> Result<bool> {
        let dir = self.root.join(platform);
        if !dir.is_dir() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir)?;
        log::debug!("Removed backups at {}", dir.display());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn android_project() -> (tempfile::TempDir, Manifest) {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("platforms/android");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("AndroidManifest.xml"), "<manifest/>").unwrap();
        let manifest = Manifest::parse(Path::new("config.xml"), "<widget/>").unwrap();
        (temp, manifest)
    }

    #[test]
    fn test_backup_root_layout() {
        let guard = BackupGuard::new(Path::new("/project"), DEFAULT_PLUGIN_ID);
        assert_eq!(
            guard.snapshot_path("ios", "project.pbxproj"),
            Path::new("/project/plugins/cordova-custom-config/backup/ios/project.pbxproj")
        );
    }

    #[test]
    fn test_ensure_backup_never_overwrites() {
        let (temp, _) = android_project();
        let live = temp.path().join("platforms/android/AndroidManifest.xml");
        let mut guard = BackupGuard::new(temp.path(), DEFAULT_PLUGIN_ID);

        assert!(guard.ensure_backup(&live, "android", "AndroidManifest.xml").unwrap());
        fs::write(&live, "<manifest modified=\"true\"/>").unwrap();
        assert!(!guard.ensure_backup(&live, "android", "AndroidManifest.xml").unwrap());

        let snapshot = guard.snapshot_path("android", "AndroidManifest.xml");
        assert_eq!(fs::read_to_string(snapshot).unwrap(), "<manifest/>");
        assert!(guard.was_touched(&live));
    }

    #[test]
    fn test_applied_notice_logged_once_per_path() {
        testing_logger::setup();
        let (temp, _) = android_project();
        let live = temp.path().join("platforms/android/AndroidManifest.xml");
        let mut guard = BackupGuard::new(temp.path(), DEFAULT_PLUGIN_ID);

        guard.ensure_backup(&live, "android", "AndroidManifest.xml").unwrap();
        guard.ensure_backup(&live, "android", "AndroidManifest.xml").unwrap();

        testing_logger::validate(|logs| {
            let notices = logs
                .iter()
                .filter(|l| l.body.starts_with("Applied custom config"))
                .count();
            assert_eq!(notices, 1);
        });
    }

    #[test]
    fn test_restore_and_clean() {
        let (temp, manifest) = android_project();
        let live = temp.path().join("platforms/android/AndroidManifest.xml");
        let mut guard = BackupGuard::new(temp.path(), DEFAULT_PLUGIN_ID);
        guard.ensure_backup(&live, "android", "AndroidManifest.xml").unwrap();
        fs::write(&live, "<manifest changed=\"1\"/>").unwrap();

        let restored = guard
            .restore_platform(temp.path(), &manifest, "android", Level::Debug)
            .unwrap();
        assert_eq!(restored, vec![Artifact::AndroidManifest]);
        assert_eq!(fs::read_to_string(&live).unwrap(), "<manifest/>");

        assert!(guard.clean_platform("android").unwrap());
        assert!(!guard.has_snapshot("android", "AndroidManifest.xml"));
        assert!(!guard.clean_platform("android").unwrap());
    }

    #[test]
    fn test_restore_without_snapshots_is_a_no_op() {
        let (temp, manifest) = android_project();
        let guard = BackupGuard::new(temp.path(), DEFAULT_PLUGIN_ID);
        let restored = guard
            .restore_platform(temp.path(), &manifest, "android", Level::Debug)
            .unwrap();
        assert!(restored.is_empty());
    }
}
