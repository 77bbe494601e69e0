//! # Platform Layout
//!
//! Knows where each patched artifact lives inside an installed platform
//! directory (`<project>/platforms/<platform>`), what its snapshot is
//! called in the backup store, and which platforms are installed.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};
use walkdir::WalkDir;

use crate::error::Result;
use crate::manifest::Manifest;
use crate::model::BuildVariant;

/// Directory under the project root holding installed platforms.
pub const PLATFORMS_DIR: &str = "platforms";

pub const ANDROID: &str = "android";
pub const IOS: &str = "ios";

/// The four build-setting override files shipped in `platforms/ios/cordova`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XcConfigFile {
    Build,
    BuildExtras,
    BuildDebug,
    BuildRelease,
}

impl XcConfigFile {
    pub const ALL: [XcConfigFile; 4] = [
        XcConfigFile::Build,
        XcConfigFile::BuildExtras,
        XcConfigFile::BuildDebug,
        XcConfigFile::BuildRelease,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            XcConfigFile::Build => "build.xcconfig",
            XcConfigFile::BuildExtras => "build-extras.xcconfig",
            XcConfigFile::BuildDebug => "build-debug.xcconfig",
            XcConfigFile::BuildRelease => "build-release.xcconfig",
        }
    }

    /// The build variant the file applies to; `None` for the common files.
    pub fn build_variant(self) -> Option<BuildVariant> {
        match self {
            XcConfigFile::BuildDebug => Some(BuildVariant::Debug),
            XcConfigFile::BuildRelease => Some(BuildVariant::Release),
            XcConfigFile::Build | XcConfigFile::BuildExtras => None,
        }
    }
}

/// Native format of an artifact, used to pick its adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    TreeXml,
    Plist,
    BuildSettings,
    OverrideFile,
}

/// A platform-native file the engine patches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    AndroidManifest,
    InfoPlist,
    ProjectFile,
    XcConfig(XcConfigFile),
}

impl Artifact {
    pub fn kind(self) -> ArtifactKind {
        match self {
            Artifact::AndroidManifest => ArtifactKind::TreeXml,
            Artifact::InfoPlist => ArtifactKind::Plist,
            Artifact::ProjectFile => ArtifactKind::BuildSettings,
            Artifact::XcConfig(_) => ArtifactKind::OverrideFile,
        }
    }

    /// Map a `<config-file target="..">` value to an artifact.
    pub fn from_target(platform: &str, target: &str) -> Option<Self> {
        match platform {
            ANDROID if target.ends_with("AndroidManifest.xml") => Some(Artifact::AndroidManifest),
            IOS if target.contains("Info.plist") => Some(Artifact::InfoPlist),
            _ => None,
        }
    }

    /// File name of this artifact's snapshot in the backup store.
    pub fn backup_name(self, manifest: &Manifest) -> Result<String> {
        Ok(match self {
            Artifact::AndroidManifest => "AndroidManifest.xml".to_string(),
            Artifact::InfoPlist => format!("{}-Info.plist", manifest.require_project_name()?),
            Artifact::ProjectFile => "project.pbxproj".to_string(),
            Artifact::XcConfig(file) => file.file_name().to_string(),
        })
    }

    /// Location of the live artifact inside `platform_dir`.
    pub fn live_path(self, platform_dir: &Path, manifest: &Manifest) -> Result<PathBuf> {
        Ok(match self {
            Artifact::AndroidManifest => {
                let modern = platform_dir
                    .join("app")
                    .join("src")
                    .join("main")
                    .join("AndroidManifest.xml");
                if modern.is_file() {
                    modern
                } else {
                    platform_dir.join("AndroidManifest.xml")
                }
            }
            Artifact::InfoPlist => {
                let name = manifest.require_project_name()?;
                platform_dir.join(name).join(format!("{}-Info.plist", name))
            }
            Artifact::ProjectFile => {
                let name = manifest.require_project_name()?;
                platform_dir
                    .join(format!("{}.xcodeproj", name))
                    .join("project.pbxproj")
            }
            Artifact::XcConfig(file) => platform_dir.join("cordova").join(file.file_name()),
        })
    }

    /// Every artifact that may have a snapshot for `platform`.
    pub fn restorable(platform: &str) -> Vec<Artifact> {
        match platform {
            ANDROID => vec![Artifact::AndroidManifest],
            IOS => {
                let mut artifacts = vec![Artifact::InfoPlist, Artifact::ProjectFile];
                artifacts.extend(XcConfigFile::ALL.into_iter().map(Artifact::XcConfig));
                artifacts
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::AndroidManifest => f.write_str("AndroidManifest.xml"),
            Artifact::InfoPlist => f.write_str("Info.plist"),
            Artifact::ProjectFile => f.write_str("project.pbxproj"),
            Artifact::XcConfig(file) => f.write_str(file.file_name()),
        }
    }
}

impl Serialize for Artifact {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// `<project>/platforms/<platform>`.
pub fn platform_dir(project_root: &Path, platform: &str) -> PathBuf {
    project_root.join(PLATFORMS_DIR).join(platform)
}

/// Names of the installed platforms, lowercased and sorted.
///
/// A project without a `platforms` directory has none.
pub fn installed_platforms(project_root: &Path) -> Result<Vec<String>> {
    let root = project_root.join(PLATFORMS_DIR);
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut platforms = Vec::new();
    for entry in WalkDir::new(&root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_dir() {
            platforms.push(entry.file_name().to_string_lossy().trim().to_lowercase());
        }
    }
    Ok(platforms)
}
