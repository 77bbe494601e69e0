//! # Merge Model
//!
//! Plain data types shared by the manifest reader, the resolver and the
//! format adapters. Everything here is an owned value: nothing borrows from
//! the XML arena the manifest was parsed with, so the types can be cached,
//! cloned into merge items and printed by the `plan` command.

use std::fmt;

use serde::Serialize;

use crate::platform::Artifact;

/// Build configuration a preference is restricted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildVariant {
    Debug,
    Release,
    /// Any other configuration name declared in the project file.
    Named(String),
}

impl BuildVariant {
    /// Parse a `buildType` attribute value. Matching is case-insensitive.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "debug" => BuildVariant::Debug,
            "release" => BuildVariant::Release,
            _ => BuildVariant::Named(value.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            BuildVariant::Debug => "debug",
            BuildVariant::Release => "release",
            BuildVariant::Named(name) => name,
        }
    }

    /// Whether a configuration block named `block_name` belongs to this variant.
    pub fn matches(&self, block_name: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(block_name.trim_matches('"'))
    }
}

/// Which parts of an inserted build setting are wrapped in double quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteMode {
    None,
    Key,
    Value,
    Both,
}

impl QuoteMode {
    /// Parse a `quote` attribute value; anything unrecognised quotes both.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "none" => QuoteMode::None,
            "key" => QuoteMode::Key,
            "value" => QuoteMode::Value,
            _ => QuoteMode::Both,
        }
    }

    pub fn quotes_key(self) -> bool {
        matches!(self, QuoteMode::Key | QuoteMode::Both)
    }

    pub fn quotes_value(self) -> bool {
        matches!(self, QuoteMode::Value | QuoteMode::Both)
    }
}

/// A `<preference name=".." value=".."/>` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreferenceEntry {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_variant: Option<BuildVariant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<QuoteMode>,
    /// `xcconfigEnforce`: `Some(true)` forces an append, `Some(false)`
    /// forbids a replace, `None` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforce: Option<bool>,
    pub delete: bool,
}

impl PreferenceEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            build_variant: None,
            quote: None,
            enforce: None,
            delete: false,
        }
    }

    /// The quoting applied when a build setting is added; defaults to both.
    pub fn quote_mode(&self) -> QuoteMode {
        self.quote.unwrap_or(QuoteMode::Both)
    }
}

/// A possibly prefixed XML name as written in `config.xml`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QName {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    pub local: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl QName {
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
            namespace: None,
        }
    }

    /// Split `prefix:local` into its parts. The namespace URI is left unset.
    pub fn parse(qualified: &str) -> Self {
        match qualified.split_once(':') {
            Some((prefix, local)) => Self {
                prefix: Some(prefix.to_string()),
                local: local.to_string(),
                namespace: None,
            },
            None => Self::local(qualified),
        }
    }

    pub fn is(&self, qualified: &str) -> bool {
        match qualified.split_once(':') {
            Some((prefix, local)) => self.prefix.as_deref() == Some(prefix) && self.local == local,
            None => self.prefix.is_none() && self.local == qualified,
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// An owned copy of an element declared inside a `<config-file>` block.
///
/// This is the full set of transferable content when an element is merged:
/// the element name, its attributes in declaration order, trimmed text and
/// child elements. Comments and processing instructions are not carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XmlElement {
    pub name: QName,
    pub attributes: Vec<(QName, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((QName::parse(name), value.to_string()));
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    /// Look up an attribute by its qualified name as written (`android:name`).
    pub fn attribute(&self, qualified: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name.is(qualified))
            .map(|(_, value)| value.as_str())
    }
}

/// A `<config-file target=".." parent=".." add="..">` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigFragment {
    pub target: String,
    /// Parent selector, normalised so an absent or wildcard parent is `./`.
    pub parent: String,
    pub force_append: bool,
    pub children: Vec<XmlElement>,
}

/// Everything declared for one platform, common entries first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlatformEntries {
    pub preferences: Vec<PreferenceEntry>,
    pub fragments: Vec<ConfigFragment>,
}

/// What a merge item does to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    SetAttribute,
    DeleteAttribute,
    /// Remove the first child matching `element_name`.
    DeleteElement,
    UpsertElement,
    /// Set a build setting in the project file or an override file.
    BuildSetting,
}

/// The source node a merge item was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Payload {
    Preference(PreferenceEntry),
    Element(XmlElement),
}

/// The unit the format adapters apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeItem {
    pub artifact: Artifact,
    pub parent: String,
    pub operation: Operation,
    /// Attribute, element or setting name, depending on `operation`.
    pub element_name: String,
    pub payload: Payload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uniqueness_key: Option<String>,
    pub force_append: bool,
}

impl MergeItem {
    pub fn preference(&self) -> Option<&PreferenceEntry> {
        match &self.payload {
            Payload::Preference(entry) => Some(entry),
            Payload::Element(_) => None,
        }
    }

    pub fn element(&self) -> Option<&XmlElement> {
        match &self.payload {
            Payload::Element(element) => Some(element),
            Payload::Preference(_) => None,
        }
    }
}

impl fmt::Display for MergeItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.operation {
            Operation::SetAttribute => "set",
            Operation::DeleteAttribute => "delete-attribute",
            Operation::DeleteElement => "delete",
            Operation::UpsertElement if self.force_append => "append",
            Operation::UpsertElement => "upsert",
            Operation::BuildSetting => "setting",
        };
        write!(f, "{} {} under {}", op, self.element_name, self.parent)?;
        if let Some(key) = &self.uniqueness_key {
            write!(f, " (unique by {})", key)?;
        }
        match &self.payload {
            Payload::Preference(entry) if !entry.delete => write!(f, " = {}", entry.value),
            _ => Ok(()),
        }
    }
}
