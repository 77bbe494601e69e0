//! Shared test utilities for integration and E2E tests.
//!
//! Provides a [`TestFixture`] that lays out a Cordova project in a temporary
//! directory (`config.xml` plus generated platform files) and canned file
//! contents in [`fixtures`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new()
//!         .with_config(&fixtures::config_xml(r#"<platform name="android">..</platform>"#))
//!         .with_android_platform();
//!     // ... test code
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

use custom_config::context::{RunContext, RunOptions};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::fixtures;
    pub use super::TestFixture;
}

/// Platform files as Cordova generates them.
#[allow(dead_code)]
pub mod fixtures {
    pub const PROJECT_NAME: &str = "Demo";

    pub const ANDROID_MANIFEST: &str = r#"<?xml version='1.0' encoding='utf-8'?>
<manifest android:versionCode="10000" android:versionName="1.0.0" package="com.example.demo" xmlns:android="http://schemas.android.com/apk/res/android">
    <supports-screens android:anyDensity="true" android:largeScreens="true" android:normalScreens="true" />
    <uses-permission android:name="android.permission.INTERNET" />
    <application android:hardwareAccelerated="true" android:icon="@mipmap/icon" android:label="@string/app_name">
        <activity android:configChanges="orientation|keyboardHidden" android:label="@string/activity_name" android:launchMode="singleTop" android:name="MainActivity">
            <intent-filter android:label="@string/launcher_name">
                <action android:name="android.intent.action.MAIN" />
                <category android:name="android.intent.category.LAUNCHER" />
            </intent-filter>
        </activity>
    </application>
</manifest>
"#;

    pub const INFO_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>CFBundleDisplayName</key>
	<string>Demo</string>
	<key>CFBundleIdentifier</key>
	<string>com.example.demo</string>
</dict>
</plist>
"#;

    pub const PROJECT_PBXPROJ: &str = r#"// !$*UTF8*$!
{
	archiveVersion = 1;
	objects = {

/* Begin XCBuildConfiguration section */
		1D6058940D05DD3E006BFB54 /* Debug */ = {
			isa = XCBuildConfiguration;
			buildSettings = {
				CODE_SIGN_IDENTITY = "iPhone Developer";
				TARGETED_DEVICE_FAMILY = "1,2";
			};
			name = Debug;
		};
		1D6058950D05DD3E006BFB54 /* Release */ = {
			isa = XCBuildConfiguration;
			buildSettings = {
				CODE_SIGN_IDENTITY = "iPhone Developer";
				TARGETED_DEVICE_FAMILY = "1,2";
			};
			name = Release;
		};
/* End XCBuildConfiguration section */
	};
	rootObject = 29B97313FDCFA39411CA2CEA /* Project object */;
}
"#;

    pub const BUILD_XCCONFIG: &str =
        "// Cordova build settings\nCODE_SIGN_IDENTITY = iPhone Developer\nENABLE_BITCODE = NO\n";
    pub const BUILD_EXTRAS_XCCONFIG: &str = "";
    pub const BUILD_DEBUG_XCCONFIG: &str = "#include \"build.xcconfig\"\n";
    pub const BUILD_RELEASE_XCCONFIG: &str =
        "#include \"build.xcconfig\"\nCODE_SIGN_IDENTITY = iPhone Distribution\n";

    /// A `config.xml` for the demo project with `body` inside `<widget>`.
    pub fn config_xml(body: &str) -> String {
        format!(
            r#"<?xml version='1.0' encoding='utf-8'?>
<widget id="com.example.demo" version="1.0.0" xmlns="http://www.w3.org/ns/widgets" xmlns:android="http://schemas.android.com/apk/res/android">
    <name>Demo</name>
    {}
</widget>
"#,
            body
        )
    }
}

/// A temporary Cordova project.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write `config.xml` with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.with_file("config.xml", content)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// `platforms/android` with the manifest at the legacy location.
    pub fn with_android_platform(self) -> Self {
        self.with_file(
            "platforms/android/AndroidManifest.xml",
            fixtures::ANDROID_MANIFEST,
        )
    }

    /// `platforms/ios` with the info plist, project file and override files.
    pub fn with_ios_platform(self) -> Self {
        self.with_file("platforms/ios/Demo/Demo-Info.plist", fixtures::INFO_PLIST)
            .with_file(
                "platforms/ios/Demo.xcodeproj/project.pbxproj",
                fixtures::PROJECT_PBXPROJ,
            )
            .with_file("platforms/ios/cordova/build.xcconfig", fixtures::BUILD_XCCONFIG)
            .with_file(
                "platforms/ios/cordova/build-extras.xcconfig",
                fixtures::BUILD_EXTRAS_XCCONFIG,
            )
            .with_file(
                "platforms/ios/cordova/build-debug.xcconfig",
                fixtures::BUILD_DEBUG_XCCONFIG,
            )
            .with_file(
                "platforms/ios/cordova/build-release.xcconfig",
                fixtures::BUILD_RELEASE_XCCONFIG,
            )
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a child path in the temp directory.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Read a file below the project root.
    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.path().join(path))
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", path, e))
    }

    pub fn backup_path(&self, platform: &str, file: &str) -> PathBuf {
        self.path()
            .join("plugins/cordova-custom-config/backup")
            .join(platform)
            .join(file)
    }

    pub fn options(&self) -> RunOptions {
        RunOptions::new(self.path())
    }

    /// A run context for this project with default options.
    pub fn context(&self) -> RunContext {
        RunContext::load(self.options()).expect("Failed to load config.xml")
    }

    /// Create a command configured to run in this fixture's directory.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("custom-config");
        cmd.current_dir(self.path())
            .env_remove("CUSTOM_CONFIG_PROJECT_ROOT")
            .env_remove("CUSTOM_CONFIG_PLUGIN_ID");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
