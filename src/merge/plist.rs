//! iOS `*-Info.plist` merge operations
//!
//! Each item's parent is a top-level key of the root `<dict>`. The item's
//! payload is converted to a [`PlistValue`] and assigned wholesale to that
//! key, replacing whatever value was there.
//!
//! Text before `<plist` (XML declaration, doctype) is kept verbatim. The
//! body is written back with tab indentation and the root `<dict>` flush
//! with `<plist>`, the way Xcode writes it.

use std::path::Path;

use regex::Regex;
use xot::{Node, Xot};

use crate::error::{Error, Result};
use crate::model::{MergeItem, Operation, QName, XmlElement};
use crate::xml;

use super::FormatAdapter;

const ARTIFACT: &str = "Info.plist";

const EMPTY_STRING: &str = r"<string>\s*</string>|<string/>";

/// The value kinds a property list can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum PlistValue {
    String(String),
    Integer(String),
    Real(String),
    Boolean(bool),
    Date(String),
    Data(String),
    Array(Vec<PlistValue>),
    Dict(Vec<(String, PlistValue)>),
}

impl PlistValue {
    /// Convert a fragment element to a value.
    ///
    /// `<dict>` children must alternate `<key>` and value elements.
    pub fn from_element(element: &XmlElement) -> Result<Self> {
        let text = || element.text.clone().unwrap_or_default();
        Ok(match element.name.local.as_str() {
            "string" => PlistValue::String(text()),
            "integer" => PlistValue::Integer(text()),
            "real" => PlistValue::Real(text()),
            "true" => PlistValue::Boolean(true),
            "false" => PlistValue::Boolean(false),
            "date" => PlistValue::Date(text()),
            "data" => PlistValue::Data(text()),
            "array" => PlistValue::Array(
                element
                    .children
                    .iter()
                    .map(PlistValue::from_element)
                    .collect::<Result<_>>()?,
            ),
            "dict" => {
                let mut entries = Vec::new();
                let mut children = element.children.iter();
                while let Some(key) = children.next() {
                    if key.name.local != "key" {
                        return Err(invalid(format!(
                            "expected <key> in <dict>, found <{}>",
                            key.name
                        )));
                    }
                    let Some(value) = children.next() else {
                        return Err(invalid(format!(
                            "key '{}' has no value",
                            key.text.as_deref().unwrap_or_default()
                        )));
                    };
                    entries.push((key.text.clone().unwrap_or_default(), Self::from_element(value)?));
                }
                PlistValue::Dict(entries)
            }
            other => return Err(invalid(format!("<{}> is not a property list value", other))),
        })
    }

    /// The element this value serializes to.
    pub fn to_element(&self) -> XmlElement {
        let leaf = |tag: &str, text: &str| {
            let element = XmlElement::new(QName::local(tag));
            if text.is_empty() {
                element
            } else {
                element.with_text(text)
            }
        };
        match self {
            PlistValue::String(s) => leaf("string", s),
            PlistValue::Integer(s) => leaf("integer", s),
            PlistValue::Real(s) => leaf("real", s),
            PlistValue::Boolean(true) => leaf("true", ""),
            PlistValue::Boolean(false) => leaf("false", ""),
            PlistValue::Date(s) => leaf("date", s),
            PlistValue::Data(s) => leaf("data", s),
            PlistValue::Array(items) => items
                .iter()
                .fold(XmlElement::new(QName::local("array")), |array, item| {
                    array.with_child(item.to_element())
                }),
            PlistValue::Dict(entries) => {
                entries
                    .iter()
                    .fold(XmlElement::new(QName::local("dict")), |dict, (key, value)| {
                        dict.with_child(leaf("key", key)).with_child(value.to_element())
                    })
            }
        }
    }
}

/// A parsed property list.
pub struct PlistDoc {
    header: String,
    xot: Xot,
    root: Node,
    dict: Node,
}

impl PlistDoc {
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let parse_error = |message: String| Error::ArtifactParse {
            path: path.display().to_string(),
            message,
        };
        let content = xml::strip_bom(content);
        let start = content
            .find("<plist")
            .ok_or_else(|| parse_error("no <plist> element".to_string()))?;
        let (header, body) = content.split_at(start);

        let mut xot = Xot::new();
        let (_, root) = xml::parse_document(&mut xot, body).map_err(parse_error)?;
        let dict = xml::child_elements(&xot, root, "dict")
            .next()
            .ok_or_else(|| parse_error("<plist> has no top-level <dict>".to_string()))?;

        Ok(Self {
            header: header.to_string(),
            xot,
            root,
            dict,
        })
    }

    /// The `<key>` node for `key` in the root dict.
    fn key_node(&self, key: &str) -> Option<Node> {
        xml::child_elements(&self.xot, self.dict, "key")
            .find(|&node| xml::direct_text(&self.xot, node).as_deref() == Some(key))
    }

    /// The value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<PlistValue> {
        let key_node = self.key_node(key)?;
        let value = self.next_element(key_node)?;
        let element = xml::to_xml_element(&self.xot, value)?;
        PlistValue::from_element(&element).ok()
    }

    fn next_element(&self, node: Node) -> Option<Node> {
        let mut current = self.xot.next_sibling(node);
        while let Some(sibling) = current {
            if self.xot.is_element(sibling) {
                return Some(sibling);
            }
            current = self.xot.next_sibling(sibling);
        }
        None
    }

    /// Assign `value` to `key`, replacing any prior value.
    pub fn set(&mut self, key: &str, value: &PlistValue) -> Result<()> {
        let element = value.to_element();
        match self.key_node(key) {
            Some(key_node) => {
                let name = xml::intern_name(&mut self.xot, self.root, &element.name);
                let replacement = self.xot.new_element(name);
                match self.next_element(key_node) {
                    Some(old) => self.xot.replace(old, replacement)?,
                    None => self.xot.insert_after(key_node, replacement)?,
                }
                xml::fill_element(&mut self.xot, self.root, replacement, &element)?;
            }
            None => {
                let key_element = XmlElement::new(QName::local("key")).with_text(key);
                xml::append_xml_element(&mut self.xot, self.root, self.dict, &key_element)?;
                xml::append_xml_element(&mut self.xot, self.root, self.dict, &element)?;
            }
        }
        Ok(())
    }

    /// Render the document. Empty strings are written as an explicit
    /// `<string></string>` pair.
    pub fn to_xml_string(&self) -> Result<String> {
        let empty_string = Regex::new(EMPTY_STRING).map_err(Error::Regex)?;
        let body = xml::write_pretty(&self.xot, self.root, "\t", 1);
        let body = empty_string.replace_all(&body, "<string></string>");
        Ok(format!("{}{}", self.header, body))
    }
}

/// Adapter for the iOS info property list.
pub struct PlistAdapter;

impl FormatAdapter for PlistAdapter {
    type Doc = PlistDoc;
    type Parent = String;

    fn load(&self, path: &Path, content: &str) -> Result<PlistDoc> {
        PlistDoc::parse(path, content)
    }

    fn locate_parent(&self, _doc: &mut PlistDoc, item: &MergeItem) -> Result<Option<String>> {
        let key = item.parent.trim();
        if key.is_empty() || key == "./" {
            return Ok(None);
        }
        Ok(Some(key.to_string()))
    }

    fn apply_item(&self, doc: &mut PlistDoc, key: String, item: &MergeItem) -> Result<bool> {
        if item.operation != Operation::UpsertElement {
            return Ok(false);
        }
        let element = item
            .element()
            .ok_or_else(|| invalid("expected an element payload".to_string()))?;
        let value = PlistValue::from_element(element)?;
        log::debug!("Write to plist; key={}; value={:?}", key, value);
        doc.set(&key, &value)?;
        Ok(true)
    }

    fn serialize(&self, doc: &PlistDoc) -> Result<String> {
        doc.to_xml_string()
    }
}

fn invalid(message: String) -> Error {
    Error::InvalidPayload {
        artifact: ARTIFACT.to_string(),
        message,
    }
}
