//! # Restore Path
//!
//! Copies snapshots from the backup store back over the live artifacts,
//! returning each platform to the state it was in before the first merge.
//!
//! Restoration runs per platform inside its own failure boundary. A failure
//! is logged and the remaining platforms are still restored, unless the
//! `stoponerror` setting is enabled.

use log::Level;
use serde::Serialize;

use crate::context::{RunContext, UNINSTALL_HOOK};
use crate::error::{Error, Result};
use crate::platform::Artifact;

#[derive(Debug, Clone, Copy, Default)]
pub struct RestoreOptions {
    /// Delete each platform's snapshots after a successful restore.
    pub clean: bool,
    /// Restore even when `autorestore` is disabled.
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformRestore {
    pub platform: String,
    pub restored: Vec<Artifact>,
    pub cleaned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    /// Set when restoring was disabled by configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    pub platforms: Vec<PlatformRestore>,
}

impl RestoreReport {
    pub fn restored_count(&self) -> usize {
        self.platforms.iter().map(|p| p.restored.len()).sum()
    }
}

fn restore_platform(
    ctx: &RunContext,
    platform: &str,
    options: &RestoreOptions,
    level: Level,
) -> Result<PlatformRestore> {
    let restored =
        ctx.backups
            .restore_platform(ctx.project_root(), &ctx.manifest, platform, level)?;
    let cleaned = if options.clean {
        ctx.backups.clean_platform(platform)?
    } else {
        false
    };
    Ok(PlatformRestore {
        platform: platform.to_string(),
        restored,
        cleaned,
        error: None,
    })
}

/// Restore every selected platform.
pub fn restore_all(ctx: &RunContext, options: &RestoreOptions) -> Result<RestoreReport> {
    if !ctx.settings.autorestore && !options.force {
        log::info!("Skipping auto-restore of config file backup(s) due to config.xml preference");
        return Ok(RestoreReport {
            skipped: Some("autorestore is disabled".to_string()),
            platforms: Vec::new(),
        });
    }

    let level = if ctx.options.hook == UNINSTALL_HOOK {
        Level::Info
    } else {
        Level::Debug
    };

    let mut report = RestoreReport::default();
    for platform in ctx.platforms()? {
        match restore_platform(ctx, &platform, options, level) {
            Ok(restored) => report.platforms.push(restored),
            Err(e) => {
                log::error!("Error restoring backups for platform '{}': {}", platform, e);
                if ctx.stop_on_error() {
                    return Err(Error::Platform {
                        platform,
                        message: e.to_string(),
                    });
                }
                report.platforms.push(PlatformRestore {
                    platform,
                    restored: Vec::new(),
                    cleaned: false,
                    error: Some(e.to_string()),
                });
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::TempDir;

    use super::*;
    use crate::context::RunOptions;
    use crate::manifest::Manifest;

    const CONFIG: &str = r#"<widget id="com.example" version="1.0.0">
    <name>Demo</name>
</widget>"#;

    fn project(config: &str) -> (TempDir, RunContext) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(root.join("config.xml"), config).unwrap();
        fs::create_dir_all(root.join("platforms/android")).unwrap();
        fs::write(
            root.join("platforms/android/AndroidManifest.xml"),
            "<manifest modified=\"yes\"/>",
        )
        .unwrap();
        let backup = root.join("plugins/cordova-custom-config/backup/android");
        fs::create_dir_all(&backup).unwrap();
        fs::write(backup.join("AndroidManifest.xml"), "<manifest/>").unwrap();

        let ctx = RunContext::with_manifest(
            RunOptions::new(root),
            Manifest::parse(&root.join("config.xml"), config).unwrap(),
        );
        (tmp, ctx)
    }

    fn live(root: &Path) -> String {
        fs::read_to_string(root.join("platforms/android/AndroidManifest.xml")).unwrap()
    }

    #[test]
    fn test_restores_snapshot() {
        let (tmp, ctx) = project(CONFIG);
        let report = restore_all(&ctx, &RestoreOptions::default()).unwrap();
        assert_eq!(report.restored_count(), 1);
        assert_eq!(live(tmp.path()), "<manifest/>");
        assert!(ctx.backups.has_snapshot("android", "AndroidManifest.xml"));
    }

    #[test]
    fn test_clean_removes_snapshots() {
        let (tmp, ctx) = project(CONFIG);
        let options = RestoreOptions {
            clean: true,
            force: false,
        };
        let report = restore_all(&ctx, &options).unwrap();
        assert!(report.platforms[0].cleaned);
        assert_eq!(live(tmp.path()), "<manifest/>");
        assert!(!ctx.backups.has_snapshot("android", "AndroidManifest.xml"));
    }

    #[test]
    fn test_autorestore_disabled() {
        let config = CONFIG.replace(
            "</widget>",
            r#"<preference name="cordova-custom-config-autorestore" value="false"/></widget>"#,
        );
        let (tmp, ctx) = project(&config);
        let report = restore_all(&ctx, &RestoreOptions::default()).unwrap();
        assert!(report.skipped.is_some());
        assert_eq!(live(tmp.path()), "<manifest modified=\"yes\"/>");

        let forced = RestoreOptions {
            clean: false,
            force: true,
        };
        restore_all(&ctx, &forced).unwrap();
        assert_eq!(live(tmp.path()), "<manifest/>");
    }

    #[test]
    fn test_no_snapshots_is_a_no_op() {
        let (tmp, ctx) = project(CONFIG);
        fs::remove_dir_all(tmp.path().join("plugins")).unwrap();
        let report = restore_all(&ctx, &RestoreOptions::default()).unwrap();
        assert_eq!(report.restored_count(), 0);
        assert_eq!(live(tmp.path()), "<manifest modified=\"yes\"/>");
    }

    #[test]
    fn test_uninstall_hook_logs_at_info() {
        testing_logger::setup();
        let (_tmp, mut ctx) = project(CONFIG);
        ctx.options.hook = UNINSTALL_HOOK.to_string();
        restore_all(&ctx, &RestoreOptions::default()).unwrap();
        testing_logger::validate(|logs| {
            assert!(logs
                .iter()
                .any(|l| l.level == Level::Info && l.body.starts_with("Restored backup of")));
        });
    }
}
