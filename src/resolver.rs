//! # Selector/Target Resolver
//!
//! Turns manifest records into [`MergeItem`]s: which artifact each record
//! patches, where inside it, and under which merge policy.
//!
//! ## Preferences
//!
//! - Android legacy names are mapped through a fixed preference table.
//! - Android path-style names (`android-manifest/<selector>/@<attribute>`)
//!   carry their own parent selector and destination.
//! - iOS `ios-XCBuildConfiguration-<SETTING>` names become one build-settings
//!   item for the project file plus one item per override file.
//! - Anything else is dropped without error.
//!
//! ## Fragments
//!
//! Blocks sharing `(target, parent, add)` are grouped at the position of the
//! first one. Each direct child element becomes one upsert item; its
//! uniqueness key comes from the multiplicity table.
//!
//! Preference items precede fragment items within an artifact.

use serde::Serialize;

use crate::model::{
    ConfigFragment, MergeItem, Operation, Payload, PlatformEntries, PreferenceEntry, XmlElement,
};
use crate::platform::{Artifact, XcConfigFile, ANDROID, IOS};
use crate::selector::{Selector, ACTIVITY_PLACEHOLDER, LEGACY_ACTIVITY_NAMES};

/// Prefix of path-style Android preference names.
const MANIFEST_PATH_PREFIX: &str = "android-manifest/";

const ENTRY_ACTIVITY: &str = "application/activity[@android:name='{ActivityName}']";

/// Legacy Android preferences: name, parent selector, destination attribute.
const ANDROID_PREFERENCES: &[(&str, &str, &str)] = &[
    ("android-manifest-hardwareAccelerated", "./", "android:hardwareAccelerated"),
    ("android-installLocation", "./", "android:installLocation"),
    ("android-activity-hardwareAccelerated", "application", "android:hardwareAccelerated"),
    ("android-configChanges", ENTRY_ACTIVITY, "android:configChanges"),
    ("android-launchMode", ENTRY_ACTIVITY, "android:launchMode"),
    ("android-theme", ENTRY_ACTIVITY, "android:theme"),
    ("android-windowSoftInputMode", ENTRY_ACTIVITY, "android:windowSoftInputMode"),
];

/// Elements that may repeat under a parent: tag, parent, uniqueness key.
const ANDROID_MULTIPLES: &[(&str, &str, &str)] = &[
    ("uses-permission", "./", "android:name"),
    ("permission", "./", "android:name"),
    ("permission-tree", "./", "android:name"),
    ("permission-group", "./", "android:name"),
    ("instrumentation", "./", "android:name"),
    ("uses-configuration", "./", "android:name"),
    ("uses-feature", "./", "android:name"),
    ("compatible-screens", "./", "android:name"),
    ("activity", "application", "android:name"),
    ("activity-alias", "application", "android:name"),
    ("service", "application", "android:name"),
    ("receiver", "application", "android:name"),
    ("provider", "application", "android:name"),
    ("uses-library", "application", "android:name"),
    ("meta-data", "application", "android:name"),
    ("intent-filter", ENTRY_ACTIVITY, "android:label"),
    ("meta-data", ENTRY_ACTIVITY, "android:name"),
];

/// Items for one artifact, in application order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPlan {
    pub artifact: Artifact,
    pub items: Vec<MergeItem>,
}

/// Resolve everything declared for `platform`, grouped per artifact in the
/// order each artifact is first targeted.
pub fn resolve_platform(platform: &str, entries: &PlatformEntries) -> Vec<ArtifactPlan> {
    let items = entries
        .preferences
        .iter()
        .flat_map(|entry| resolve_preference(platform, entry))
        .chain(resolve_fragments(platform, &entries.fragments));

    let mut plans: Vec<ArtifactPlan> = Vec::new();
    for item in items {
        match plans.iter_mut().find(|plan| plan.artifact == item.artifact) {
            Some(plan) => plan.items.push(item),
            None => plans.push(ArtifactPlan {
                artifact: item.artifact,
                items: vec![item],
            }),
        }
    }
    plans
}

/// Items for one preference; empty when the name is not recognised.
pub fn resolve_preference(platform: &str, entry: &PreferenceEntry) -> Vec<MergeItem> {
    match platform {
        ANDROID => resolve_android_preference(entry).into_iter().collect(),
        IOS => resolve_ios_preference(entry),
        _ => Vec::new(),
    }
}

fn attribute_item(parent: &str, destination: &str, entry: &PreferenceEntry) -> MergeItem {
    let (operation, element_name) = match destination.strip_prefix('@') {
        Some(attribute) if entry.delete => (Operation::DeleteAttribute, attribute),
        Some(attribute) => (Operation::SetAttribute, attribute),
        None if entry.delete => (Operation::DeleteElement, destination),
        None => (Operation::SetAttribute, destination),
    };
    MergeItem {
        artifact: Artifact::AndroidManifest,
        parent: parent.to_string(),
        operation,
        element_name: element_name.to_string(),
        payload: Payload::Preference(entry.clone()),
        uniqueness_key: None,
        force_append: false,
    }
}

fn resolve_android_preference(entry: &PreferenceEntry) -> Option<MergeItem> {
    if let Some(path) = entry.name.strip_prefix(MANIFEST_PATH_PREFIX) {
        let (parent, destination) = split_destination(path);
        if destination.is_empty() {
            log::debug!("Ignoring preference '{}' without a destination", entry.name);
            return None;
        }
        let parent = if parent.is_empty() { "./" } else { parent };
        return Some(attribute_item(parent, destination, entry));
    }

    ANDROID_PREFERENCES
        .iter()
        .find(|(name, _, _)| *name == entry.name)
        .map(|(_, parent, attribute)| {
            let destination = format!("@{}", attribute);
            attribute_item(parent, &destination, entry)
        })
}

/// Split a path at its last `/` outside of predicate brackets.
fn split_destination(path: &str) -> (&str, &str) {
    let mut depth = 0usize;
    let mut split = None;
    for (index, c) in path.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => split = Some(index),
            _ => {}
        }
    }
    match split {
        Some(index) => (&path[..index], &path[index + 1..]),
        None => ("", path),
    }
}

fn resolve_ios_preference(entry: &PreferenceEntry) -> Vec<MergeItem> {
    let Some(rest) = entry.name.strip_prefix("ios-") else {
        return Vec::new();
    };
    let Some((kind, setting)) = rest.split_once('-') else {
        return Vec::new();
    };
    if kind != "XCBuildConfiguration" {
        log::debug!("Ignoring unsupported iOS preference type '{}'", kind);
        return Vec::new();
    }
    if setting.is_empty() {
        return Vec::new();
    }

    let item = |artifact: Artifact| MergeItem {
        artifact,
        parent: kind.to_string(),
        operation: Operation::BuildSetting,
        element_name: setting.to_string(),
        payload: Payload::Preference(entry.clone()),
        uniqueness_key: None,
        force_append: false,
    };

    let mut items = vec![item(Artifact::ProjectFile)];
    items.extend(
        XcConfigFile::ALL
            .into_iter()
            .map(|file| item(Artifact::XcConfig(file))),
    );
    items
}

/// Items for every fragment, grouped by `(target, parent, add)`.
pub fn resolve_fragments(platform: &str, fragments: &[ConfigFragment]) -> Vec<MergeItem> {
    let mut groups: Vec<(&ConfigFragment, Vec<&XmlElement>)> = Vec::new();
    for fragment in fragments {
        let existing = groups.iter_mut().find(|(first, _)| {
            first.target == fragment.target
                && first.parent == fragment.parent
                && first.force_append == fragment.force_append
        });
        match existing {
            Some((_, children)) => children.extend(fragment.children.iter()),
            None => groups.push((fragment, fragment.children.iter().collect())),
        }
    }

    let mut items = Vec::new();
    for (fragment, children) in groups {
        let Some(artifact) = Artifact::from_target(platform, &fragment.target) else {
            log::debug!(
                "Ignoring config-file target '{}' for platform {}",
                fragment.target,
                platform
            );
            continue;
        };
        for child in children {
            let element_name = child.name.to_string();
            let uniqueness_key = match artifact {
                Artifact::AndroidManifest => uniqueness_key(&element_name, &fragment.parent),
                _ => None,
            };
            items.push(MergeItem {
                artifact,
                parent: fragment.parent.clone(),
                operation: Operation::UpsertElement,
                element_name,
                payload: Payload::Element(child.clone()),
                uniqueness_key: uniqueness_key.map(str::to_string),
                force_append: fragment.force_append,
            });
        }
    }
    items
}

/// Attribute that distinguishes repeated `tag` elements under `parent`.
///
/// Parents are compared in canonical selector form, with the entry activity
/// matched under either legacy spelling or the placeholder.
pub fn uniqueness_key(tag: &str, parent: &str) -> Option<&'static str> {
    let parent = Selector::parse(parent).ok()?;
    ANDROID_MULTIPLES
        .iter()
        .filter(|(multiple, _, _)| *multiple == tag)
        .find(|(_, table_parent, _)| {
            let Ok(table_parent) = Selector::parse(table_parent) else {
                return false;
            };
            if table_parent == parent {
                return true;
            }
            LEGACY_ACTIVITY_NAMES
                .iter()
                .chain(std::iter::once(&ACTIVITY_PLACEHOLDER))
                .any(|name| table_parent.with_activity(name) == parent.with_activity(name))
        })
        .map(|(_, _, key)| *key)
}
