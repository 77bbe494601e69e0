//! Integration tests for merging config.xml into the iOS project files.

mod common;

use common::prelude::*;
use pretty_assertions::assert_eq;

use custom_config::merge;
use custom_config::platform::{Artifact, XcConfigFile};
use custom_config::report::ArtifactOutcome;
use custom_config::restore::{self, RestoreOptions};

const PLIST_PATH: &str = "platforms/ios/Demo/Demo-Info.plist";
const PBXPROJ_PATH: &str = "platforms/ios/Demo.xcodeproj/project.pbxproj";
const BUILD_XCCONFIG_PATH: &str = "platforms/ios/cordova/build.xcconfig";

const IOS_CONFIG: &str = r#"<platform name="ios">
        <preference name="ios-XCBuildConfiguration-ENABLE_BITCODE" value="YES" />
        <preference name="ios-XCBuildConfiguration-CODE_SIGN_IDENTITY" value="Apple Development" buildType="debug" quote="value" />
        <config-file target="*-Info.plist" parent="NSCameraUsageDescription">
            <string>Scan codes</string>
        </config-file>
    </platform>"#;

fn ios_project(body: &str) -> TestFixture {
    TestFixture::new()
        .with_config(&fixtures::config_xml(body))
        .with_ios_platform()
}

#[test]
fn test_plist_key_is_added() {
    let fixture = ios_project(IOS_CONFIG);
    merge::apply(&mut fixture.context()).unwrap();

    let plist = fixture.read(PLIST_PATH);
    assert!(plist.starts_with(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE plist PUBLIC"
    ));
    assert!(plist.contains(
        "\t<key>NSCameraUsageDescription</key>\n\t<string>Scan codes</string>\n</dict>"
    ));
    assert!(plist.contains("\t<key>CFBundleDisplayName</key>\n\t<string>Demo</string>\n"));
}

#[test]
fn test_build_settings_in_project_file() {
    let fixture = ios_project(IOS_CONFIG);
    merge::apply(&mut fixture.context()).unwrap();

    let project = fixture.read(PBXPROJ_PATH);
    // absent everywhere: added to every block
    assert_eq!(project.matches("\"ENABLE_BITCODE\" = \"YES\";").count(), 2);
    // present: replaced in the debug block only
    assert_eq!(
        project
            .matches("CODE_SIGN_IDENTITY = \"Apple Development\";")
            .count(),
        1
    );
    assert_eq!(
        project
            .matches("CODE_SIGN_IDENTITY = \"iPhone Developer\";")
            .count(),
        1
    );
    assert!(project.ends_with("rootObject = 29B97313FDCFA39411CA2CEA /* Project object */;\n}\n"));
}

#[test]
fn test_xcconfig_overrides() {
    let fixture = ios_project(IOS_CONFIG);
    let report = merge::apply(&mut fixture.context()).unwrap();

    insta::assert_snapshot!(fixture.read(BUILD_XCCONFIG_PATH), @r"
    // Cordova build settings
    CODE_SIGN_IDENTITY = Apple Development
    ENABLE_BITCODE = YES
    ");
    assert_eq!(
        fixture.read("platforms/ios/cordova/build-debug.xcconfig"),
        fixtures::BUILD_DEBUG_XCCONFIG
    );
    assert_eq!(
        fixture.read("platforms/ios/cordova/build-release.xcconfig"),
        fixtures::BUILD_RELEASE_XCCONFIG
    );

    let outcome = |artifact: Artifact| {
        report.platforms[0]
            .artifacts
            .iter()
            .find(|a| a.artifact == artifact)
            .map(|a| a.outcome)
    };
    assert_eq!(
        outcome(Artifact::XcConfig(XcConfigFile::Build)),
        Some(ArtifactOutcome::Modified)
    );
    assert_eq!(
        outcome(Artifact::XcConfig(XcConfigFile::BuildExtras)),
        Some(ArtifactOutcome::Unchanged)
    );
    assert_eq!(report.modified_count(), 3);
}

#[test]
fn test_list_valued_setting_is_replaced() {
    let project = fixtures::PROJECT_PBXPROJ.replace(
        "TARGETED_DEVICE_FAMILY = \"1,2\";",
        "OTHER_LDFLAGS = (\n\t\t\t\t\t\"-ObjC\",\n\t\t\t\t);\n\t\t\t\tTARGETED_DEVICE_FAMILY = \"1,2\";",
    );
    let fixture = ios_project(
        r#"<platform name="ios">
            <preference name="ios-XCBuildConfiguration-OTHER_LDFLAGS" value="-lz" />
        </platform>"#,
    )
    .with_file(PBXPROJ_PATH, &project);
    merge::apply(&mut fixture.context()).unwrap();

    let merged = fixture.read(PBXPROJ_PATH);
    assert_eq!(merged.matches("OTHER_LDFLAGS").count(), 2);
    assert_eq!(merged.matches("OTHER_LDFLAGS = \"-lz\";").count(), 2);
    assert!(!merged.contains("-ObjC"));
}

#[test]
fn test_enforced_setting_is_appended() {
    let fixture = ios_project(
        r#"<platform name="ios">
            <preference name="ios-XCBuildConfiguration-SWIFT_VERSION" value="5.0" buildType="release" xcconfigEnforce="true" />
        </platform>"#,
    );
    merge::apply(&mut fixture.context()).unwrap();
    assert_eq!(
        fixture.read("platforms/ios/cordova/build-release.xcconfig"),
        format!("{}SWIFT_VERSION = 5.0\n", fixtures::BUILD_RELEASE_XCCONFIG)
    );
}

#[test]
fn test_restore_round_trip() {
    let fixture = ios_project(IOS_CONFIG);
    let mut ctx = fixture.context();
    merge::apply(&mut ctx).unwrap();
    assert_ne!(fixture.read(PLIST_PATH), fixtures::INFO_PLIST);

    let report = restore::restore_all(&ctx, &RestoreOptions::default()).unwrap();
    assert_eq!(report.restored_count(), 3);
    assert_eq!(fixture.read(PLIST_PATH), fixtures::INFO_PLIST);
    assert_eq!(fixture.read(PBXPROJ_PATH), fixtures::PROJECT_PBXPROJ);
    assert_eq!(fixture.read(BUILD_XCCONFIG_PATH), fixtures::BUILD_XCCONFIG);
}

#[test]
fn test_malformed_project_file_is_abandoned() {
    let fixture = ios_project(IOS_CONFIG).with_file(PBXPROJ_PATH, "{ objects = { }; }");
    let report = merge::apply(&mut fixture.context()).unwrap();

    let platform = &report.platforms[0];
    assert!(platform.error.is_none());
    let project = platform
        .artifacts
        .iter()
        .find(|a| a.artifact == Artifact::ProjectFile)
        .unwrap();
    assert_eq!(project.outcome, ArtifactOutcome::Abandoned);
    assert_eq!(fixture.read(PBXPROJ_PATH), "{ objects = { }; }");
    assert!(fixture.read(PLIST_PATH).contains("NSCameraUsageDescription"));
}

#[test]
fn test_missing_project_name_fails_platform() {
    let fixture = TestFixture::new()
        .with_config(&fixtures::config_xml(IOS_CONFIG).replace("<name>Demo</name>", ""))
        .with_ios_platform();
    let mut ctx = fixture.context();
    let report = merge::merge_all(&mut ctx).unwrap();

    assert!(report.platforms[0].error.is_some());
    assert!(report.check(false).is_ok());
    assert!(report.check(true).is_err());
}
