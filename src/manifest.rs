//! # Manifest Reader
//!
//! Loads the project descriptor (`config.xml`) and extracts the two kinds
//! of records the merge engine consumes:
//!
//! - `<preference name=".." value=".."/>` declarations
//! - `<config-file target=".." parent=".." add="..">` fragment blocks
//!
//! Records are either common (direct children of `<widget>`) or scoped to a
//! platform (`<platform name="android">` sections). A top-level
//! `<config-file>` may also carry a `platform` attribute, which scopes it
//! the same way.
//!
//! The document is parsed once into owned records. [`Manifest::read_entries`]
//! memoizes the per-platform view it builds, so repeated calls for the same
//! platform share one allocation.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use xot::{Node, Xot};

use crate::error::{Error, Result};
use crate::model::{BuildVariant, ConfigFragment, PlatformEntries, PreferenceEntry, QuoteMode};
use crate::xml;

/// File name of the project descriptor at the project root.
pub const MANIFEST_FILE: &str = "config.xml";

#[derive(Debug, Default)]
struct PlatformSection {
    preferences: Vec<PreferenceEntry>,
    fragments: Vec<ConfigFragment>,
}

/// The parsed project descriptor.
#[derive(Debug)]
pub struct Manifest {
    path: PathBuf,
    project_name: Option<String>,
    common_preferences: Vec<PreferenceEntry>,
    sections: HashMap<String, PlatformSection>,
    cache: RefCell<HashMap<String, Rc<PlatformEntries>>>,
}

impl Manifest {
    /// Load `config.xml` from the project root.
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = project_root.join(MANIFEST_FILE);
        let content = fs::read_to_string(&path).map_err(|e| Error::ManifestParse {
            path: path.display().to_string(),
            message: e.to_string(),
            hint: Some("run from the project root or pass --project-root".to_string()),
        })?;
        Self::parse(&path, &content)
    }

    /// Parse descriptor content. `path` is only used in diagnostics.
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let mut xot = Xot::new();
        let (_, root) = xml::parse_document(&mut xot, content).map_err(|message| {
            let hint = if message.contains("Unknown prefix") {
                Some(format!(
                    "declare xmlns:android=\"{}\" on the <widget> element",
                    xml::ANDROID_NAMESPACE
                ))
            } else {
                None
            };
            Error::ManifestParse {
                path: path.display().to_string(),
                message,
                hint,
            }
        })?;

        if xml::local_name(&xot, root) != Some("widget") {
            return Err(Error::ManifestParse {
                path: path.display().to_string(),
                message: format!(
                    "root element is <{}>, expected <widget>",
                    xml::local_name(&xot, root).unwrap_or_default()
                ),
                hint: None,
            });
        }

        let project_name = xml::child_elements(&xot, root, "name")
            .next()
            .and_then(|node| xml::direct_text(&xot, node));

        let common_preferences = read_preferences(&xot, root);

        let mut sections: HashMap<String, PlatformSection> = HashMap::new();
        for child in xot.children(root) {
            match xml::local_name(&xot, child) {
                Some("platform") => {
                    let Some(name) = xml::attribute_local(&xot, child, "name") else {
                        log::warn!("Ignoring <platform> without a name attribute");
                        continue;
                    };
                    let section = sections.entry(normalize_platform(name)).or_default();
                    section.preferences.extend(read_preferences(&xot, child));
                    section.fragments.extend(read_fragments(&xot, child));
                }
                Some("config-file") => {
                    let Some(platform) = xml::attribute_local(&xot, child, "platform") else {
                        log::debug!("Ignoring top-level <config-file> without a platform attribute");
                        continue;
                    };
                    if let Some(fragment) = read_fragment(&xot, child) {
                        sections
                            .entry(normalize_platform(platform))
                            .or_default()
                            .fragments
                            .push(fragment);
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            project_name,
            common_preferences,
            sections,
            cache: RefCell::new(HashMap::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Text of the `<name>` element, if declared.
    pub fn project_name(&self) -> Option<&str> {
        self.project_name.as_deref()
    }

    /// The project name, or an error explaining why it is required.
    pub fn require_project_name(&self) -> Result<&str> {
        self.project_name().ok_or_else(|| Error::ManifestParse {
            path: self.path.display().to_string(),
            message: "missing <name> element".to_string(),
            hint: Some("iOS artifacts are located by the project name".to_string()),
        })
    }

    /// Preferences declared directly under `<widget>`.
    pub fn common_preferences(&self) -> &[PreferenceEntry] {
        &self.common_preferences
    }

    /// Common entries followed by those scoped to `platform`.
    pub fn read_entries(&self, platform: &str) -> Rc<PlatformEntries> {
        let key = normalize_platform(platform);
        if let Some(entries) = self.cache.borrow().get(&key) {
            return Rc::clone(entries);
        }

        let mut entries = PlatformEntries {
            preferences: self.common_preferences.clone(),
            fragments: Vec::new(),
        };
        if let Some(section) = self.sections.get(&key) {
            entries.preferences.extend(section.preferences.iter().cloned());
            entries.fragments.extend(section.fragments.iter().cloned());
        }

        let entries = Rc::new(entries);
        self.cache.borrow_mut().insert(key, Rc::clone(&entries));
        entries
    }
}

fn normalize_platform(name: &str) -> String {
    name.trim().to_lowercase()
}

fn read_preferences(xot: &Xot, parent: Node) -> Vec<PreferenceEntry> {
    xml::child_elements(xot, parent, "preference")
        .filter_map(|node| read_preference(xot, node))
        .collect()
}

fn read_preference(xot: &Xot, node: Node) -> Option<PreferenceEntry> {
    let name = xml::attribute_local(xot, node, "name")?;
    let mut entry = PreferenceEntry::new(
        name,
        xml::attribute_local(xot, node, "value").unwrap_or_default(),
    );
    entry.build_variant = xml::attribute_local(xot, node, "buildType").map(BuildVariant::parse);
    entry.quote = xml::attribute_local(xot, node, "quote").map(QuoteMode::parse);
    entry.enforce = match xml::attribute_local(xot, node, "xcconfigEnforce") {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    };
    entry.delete = xml::attribute_local(xot, node, "delete") == Some("true");
    Some(entry)
}

fn read_fragments(xot: &Xot, parent: Node) -> Vec<ConfigFragment> {
    xml::child_elements(xot, parent, "config-file")
        .filter_map(|node| read_fragment(xot, node))
        .collect()
}

fn read_fragment(xot: &Xot, node: Node) -> Option<ConfigFragment> {
    let Some(target) = xml::attribute_local(xot, node, "target") else {
        log::warn!("Ignoring <config-file> without a target attribute");
        return None;
    };
    let parent = match xml::attribute_local(xot, node, "parent") {
        None | Some("") | Some("/*") | Some("*/") => "./".to_string(),
        Some(parent) => parent.to_string(),
    };
    Some(ConfigFragment {
        target: target.to_string(),
        parent,
        force_append: xml::attribute_local(xot, node, "add") == Some("true"),
        children: xot
            .children(node)
            .filter_map(|child| xml::to_xml_element(xot, child))
            .collect(),
    })
}
