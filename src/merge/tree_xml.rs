//! Android manifest merge operations
//!
//! Tree-structured XML adapter. Parent selectors are resolved against the
//! live tree with a fixed fallback order:
//!
//! 1. the selector as written
//! 2. the selector searched one level down (`*/<selector>`)
//! 3. for selectors containing `{ActivityName}`, each legacy activity
//!    spelling, again as written and then one level down
//!
//! Attribute preferences create any missing path segments; fragments never
//! do. Output is rewritten with 4-space indentation.

use std::path::Path;

use xot::{Node, Xot};

use crate::error::{Error, Result};
use crate::model::{MergeItem, Operation, QName};
use crate::selector::{NodeTest, Selector, Step, LEGACY_ACTIVITY_NAMES};
use crate::xml;

use super::FormatAdapter;

const XML_DECLARATION: &str = "<?xml version='1.0' encoding='utf-8'?>\n";
const INDENT: &str = "    ";

/// A parsed manifest.
pub struct TreeDoc {
    xot: Xot,
    document: Node,
    root: Node,
}

impl TreeDoc {
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let mut xot = Xot::new();
        let (document, root) =
            xml::parse_document(&mut xot, content).map_err(|message| Error::ArtifactParse {
                path: path.display().to_string(),
                message,
            })?;
        Ok(Self {
            xot,
            document,
            root,
        })
    }

    /// First node matched by `selector`, trying every fallback.
    pub fn find_with_fallback(&self, selector: &Selector) -> Option<Node> {
        let mut candidates = vec![selector.clone(), selector.one_level_down()];
        if selector.has_placeholder() {
            for name in LEGACY_ACTIVITY_NAMES {
                let substituted = selector.with_activity(name);
                candidates.push(substituted.one_level_down());
                candidates.insert(candidates.len() - 1, substituted);
            }
        }
        candidates.iter().find_map(|candidate| self.find(candidate))
    }

    /// First node matched by `selector`, in document order.
    pub fn find(&self, selector: &Selector) -> Option<Node> {
        let root_name = xml::local_name(&self.xot, self.root)?;
        let selector = selector.relative_to_root(root_name)?;
        let mut current = vec![self.root];
        for step in &selector.steps {
            current = current
                .into_iter()
                .flat_map(|node| self.step_matches(node, step))
                .collect();
            if current.is_empty() {
                return None;
            }
        }
        current.into_iter().next()
    }

    fn step_matches(&self, node: Node, step: &Step) -> Vec<Node> {
        let candidates: Vec<Node> = match &step.test {
            NodeTest::Current => vec![node],
            NodeTest::Any => self
                .xot
                .children(node)
                .filter(|&c| self.xot.is_element(c))
                .collect(),
            NodeTest::Named(name) => match xml::lookup_name(&self.xot, self.root, name) {
                Some(name_id) => self
                    .xot
                    .children(node)
                    .filter(|&c| self.xot.element(c).is_some_and(|e| e.name() == name_id))
                    .collect(),
                None => Vec::new(),
            },
        };
        candidates
            .into_iter()
            .filter(|&c| self.predicates_hold(c, step))
            .collect()
    }

    fn predicates_hold(&self, node: Node, step: &Step) -> bool {
        step.predicates.iter().all(|predicate| {
            let Some(name) = xml::lookup_name(&self.xot, self.root, &predicate.attribute) else {
                return false;
            };
            match (self.xot.attributes(node).get(name), &predicate.value) {
                (Some(actual), Some(expected)) => actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            }
        })
    }

    /// Walk `selector` from the root, creating every missing segment.
    ///
    /// Created elements carry the attributes their predicates test; the
    /// activity placeholder resolves to the newest legacy spelling.
    pub fn create_path(&mut self, selector: &Selector) -> Result<Option<Node>> {
        let Some(root_name) = xml::local_name(&self.xot, self.root).map(str::to_string) else {
            return Ok(None);
        };
        let Some(selector) = selector.relative_to_root(&root_name) else {
            return Ok(None);
        };
        let newest = LEGACY_ACTIVITY_NAMES[LEGACY_ACTIVITY_NAMES.len() - 1];
        let selector = selector.with_activity(newest);

        let mut current = self.root;
        for step in &selector.steps {
            if let Some(existing) = self.step_matches(current, step).into_iter().next() {
                current = existing;
                continue;
            }
            let NodeTest::Named(name) = &step.test else {
                return Ok(None);
            };
            let name_id = xml::intern_name(&mut self.xot, self.root, &QName::parse(name));
            let created = self.xot.new_element(name_id);
            self.xot.append(current, created)?;
            for predicate in &step.predicates {
                let attribute =
                    xml::intern_name(&mut self.xot, self.root, &QName::parse(&predicate.attribute));
                let value = predicate.value.clone().unwrap_or_default();
                self.xot.attributes_mut(created).insert(attribute, value);
            }
            log::debug!("Created <{}> for selector '{}'", name, selector);
            current = created;
        }
        Ok(Some(current))
    }

    /// Element children of `parent` named like `element`.
    fn same_named_children(&self, parent: Node, qualified: &str) -> Vec<Node> {
        let Some(name_id) = xml::lookup_name(&self.xot, self.root, qualified) else {
            return Vec::new();
        };
        self.xot
            .children(parent)
            .filter(|&c| self.xot.element(c).is_some_and(|e| e.name() == name_id))
            .collect()
    }

    fn attribute_value(&self, node: Node, qualified: &str) -> Option<&str> {
        let name = xml::lookup_name(&self.xot, self.root, qualified)?;
        self.xot.attributes(node).get(name).map(String::as_str)
    }

    /// The whole document, including comments and processing instructions
    /// around the root element.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::from(XML_DECLARATION);
        for node in self.xot.children(self.document) {
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&xml::write_pretty(&self.xot, node, INDENT, 0));
            if node != self.root && !out.ends_with('\n') {
                out.push('\n');
            }
        }
        out
    }
}

/// Adapter for `AndroidManifest.xml`.
pub struct TreeXmlAdapter;

impl FormatAdapter for TreeXmlAdapter {
    type Doc = TreeDoc;
    type Parent = Node;

    fn load(&self, path: &Path, content: &str) -> Result<TreeDoc> {
        TreeDoc::parse(path, content)
    }

    fn locate_parent(&self, doc: &mut TreeDoc, item: &MergeItem) -> Result<Option<Node>> {
        let selector = Selector::parse(&item.parent)?;
        if let Some(node) = doc.find_with_fallback(&selector) {
            return Ok(Some(node));
        }
        if item.operation == Operation::SetAttribute {
            return doc.create_path(&selector);
        }
        Ok(None)
    }

    fn apply_item(&self, doc: &mut TreeDoc, parent: Node, item: &MergeItem) -> Result<bool> {
        match item.operation {
            Operation::SetAttribute => {
                let entry = item.preference().ok_or_else(|| invalid("set-attribute needs a preference"))?;
                let name = xml::intern_name(&mut doc.xot, doc.root, &QName::parse(&item.element_name));
                doc.xot.attributes_mut(parent).insert(name, entry.value.clone());
                Ok(true)
            }
            Operation::DeleteAttribute => {
                let Some(name) = xml::lookup_name(&doc.xot, doc.root, &item.element_name)
                    .filter(|&name| doc.xot.attributes(parent).get(name).is_some())
                else {
                    log::debug!("No {} to delete under '{}'", item.element_name, item.parent);
                    return Ok(false);
                };
                doc.xot.attributes_mut(parent).remove(name);
                Ok(true)
            }
            Operation::DeleteElement => {
                let child_selector = Selector::parse(&item.element_name)?;
                let mut current = vec![parent];
                for step in &child_selector.steps {
                    current = current
                        .into_iter()
                        .flat_map(|node| doc.step_matches(node, step))
                        .collect();
                }
                match current.into_iter().find(|&node| node != parent) {
                    Some(child) => {
                        doc.xot.remove(child)?;
                        log::debug!("Deleted <{}> under '{}'", item.element_name, item.parent);
                        Ok(true)
                    }
                    None => {
                        log::debug!(
                            "Nothing to delete for '{}' under '{}'",
                            item.element_name,
                            item.parent
                        );
                        Ok(false)
                    }
                }
            }
            Operation::UpsertElement => {
                let element = item.element().ok_or_else(|| invalid("upsert needs an element"))?;
                let existing = if item.force_append {
                    None
                } else {
                    let siblings = doc.same_named_children(parent, &item.element_name);
                    match &item.uniqueness_key {
                        Some(key) => {
                            let wanted = element.attribute(key);
                            siblings
                                .into_iter()
                                .find(|&node| doc.attribute_value(node, key) == wanted)
                        }
                        None => siblings.into_iter().next(),
                    }
                };
                match existing {
                    Some(node) => xml::fill_element(&mut doc.xot, doc.root, node, element)?,
                    None => {
                        xml::append_xml_element(&mut doc.xot, doc.root, parent, element)?;
                    }
                }
                Ok(true)
            }
            Operation::BuildSetting => Err(invalid("build settings do not apply to XML manifests")),
        }
    }

    fn serialize(&self, doc: &TreeDoc) -> Result<String> {
        Ok(doc.to_xml_string())
    }
}

fn invalid(message: &str) -> Error {
    Error::InvalidPayload {
        artifact: "AndroidManifest.xml".to_string(),
        message: message.to_string(),
    }
}
