//! # Run Context
//!
//! Everything one invocation needs, built once and passed explicitly:
//! the run options, the parsed manifest with its per-platform memo, the
//! settings derived from specially named preferences, and the backup guard.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::backup::{BackupGuard, DEFAULT_PLUGIN_ID};
use crate::error::Result;
use crate::manifest::Manifest;
use crate::model::PreferenceEntry;
use crate::platform;

/// Lifecycle stage the merge runs at unless configured otherwise.
pub const DEFAULT_HOOK: &str = "after_prepare";

/// Lifecycle stage at which restores are reported at info level.
pub const UNINSTALL_HOOK: &str = "before_plugin_uninstall";

/// Marker in preference names that configure the tool itself.
const SETTINGS_MARKER: &str = "cordova-custom-config";

/// Options for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub project_root: PathBuf,
    pub plugin_id: String,
    /// Platforms to process; empty means every installed platform.
    pub platforms: Vec<String>,
    /// Lifecycle stage this run represents.
    pub hook: String,
    pub dry_run: bool,
}

impl RunOptions {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            plugin_id: DEFAULT_PLUGIN_ID.to_string(),
            platforms: Vec::new(),
            hook: DEFAULT_HOOK.to_string(),
            dry_run: false,
        }
    }
}

/// Settings read from `cordova-custom-config-<key>` preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// `autorestore`: `"false"` disables the automatic restore.
    pub autorestore: bool,
    /// `stoponerror`: `"true"` makes platform failures propagate.
    pub stop_on_error: bool,
    /// `hook`: the stage the merge is configured to run at.
    pub hook: String,
    /// Every setting as declared, keyed by the segment after the last dash.
    pub raw: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            autorestore: true,
            stop_on_error: false,
            hook: DEFAULT_HOOK.to_string(),
            raw: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn from_preferences(preferences: &[PreferenceEntry]) -> Self {
        let raw: BTreeMap<String, String> = preferences
            .iter()
            .filter(|p| p.name.contains(SETTINGS_MARKER))
            .filter_map(|p| {
                p.name
                    .rsplit('-')
                    .next()
                    .map(|key| (key.to_string(), p.value.clone()))
            })
            .collect();

        let mut settings = Settings::default();
        if raw.get("autorestore").map(String::as_str) == Some("false") {
            settings.autorestore = false;
        }
        if raw.get("stoponerror").map(String::as_str) == Some("true") {
            settings.stop_on_error = true;
        }
        if let Some(hook) = raw.get("hook").filter(|h| !h.is_empty()) {
            settings.hook = hook.clone();
        }
        settings.raw = raw;
        settings
    }
}

/// State shared by every component during one run.
///
/// Fields are public so callers can borrow the manifest and the backup
/// guard independently.
#[derive(Debug)]
pub struct RunContext {
    pub options: RunOptions,
    pub manifest: Manifest,
    pub settings: Settings,
    pub backups: BackupGuard,
}

impl RunContext {
    /// Load the manifest under `options.project_root` and derive settings.
    pub fn load(options: RunOptions) -> Result<Self> {
        let manifest = Manifest::load(&options.project_root)?;
        Ok(Self::with_manifest(options, manifest))
    }

    pub fn with_manifest(options: RunOptions, manifest: Manifest) -> Self {
        let settings = Settings::from_preferences(manifest.common_preferences());
        let backups = BackupGuard::new(&options.project_root, &options.plugin_id);
        Self {
            options,
            manifest,
            settings,
            backups,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.options.project_root
    }

    /// The selected platforms, or every installed one.
    pub fn platforms(&self) -> Result<Vec<String>> {
        if self.options.platforms.is_empty() {
            return platform::installed_platforms(self.project_root());
        }
        Ok(self
            .options
            .platforms
            .iter()
            .map(|p| p.trim().to_lowercase())
            .collect())
    }

    pub fn platform_dir(&self, platform: &str) -> PathBuf {
        platform::platform_dir(self.project_root(), platform)
    }

    /// Whether the merge is configured to run at this run's stage.
    pub fn hook_matches(&self) -> bool {
        self.options.hook == self.settings.hook
    }

    pub fn stop_on_error(&self) -> bool {
        self.settings.stop_on_error
    }
}
