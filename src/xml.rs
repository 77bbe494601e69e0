//! # XML Helpers
//!
//! Thin helpers over the `xot` tree shared by the manifest reader and the
//! XML based format adapters:
//!
//! - byte-order-mark tolerant parsing
//! - qualified name lookup and interning (`android:name` style names,
//!   declaring well-known prefixes on the root when a tree lacks them)
//! - conversion of a subtree into an owned [`XmlElement`]
//! - pretty printing with a caller-chosen indentation unit

use xot::output::{NoopNormalizer, TokenSerializeParameters};
use xot::{NameId, Node, Xot};

use crate::model::{QName, XmlElement};

pub const ANDROID_NAMESPACE: &str = "http://schemas.android.com/apk/res/android";
pub const TOOLS_NAMESPACE: &str = "http://schemas.android.com/tools";
pub const APP_NAMESPACE: &str = "http://schemas.android.com/apk/res-auto";

/// Namespace URI for prefixes that Android projects use without always
/// declaring them in `config.xml`.
pub fn well_known_namespace(prefix: &str) -> Option<&'static str> {
    match prefix {
        "android" => Some(ANDROID_NAMESPACE),
        "tools" => Some(TOOLS_NAMESPACE),
        "app" => Some(APP_NAMESPACE),
        _ => None,
    }
}

/// Drop anything before the first `<`, such as a UTF-8 byte order mark.
pub fn strip_bom(content: &str) -> &str {
    match content.find('<') {
        Some(index) => &content[index..],
        None => content,
    }
}

/// Parse a document, returning its root element.
pub fn parse_document(xot: &mut Xot, content: &str) -> Result<(Node, Node), String> {
    let doc = xot.parse(strip_bom(content)).map_err(|e| e.to_string())?;
    let root = xot.document_element(doc).map_err(|e| e.to_string())?;
    xot.remove_insignificant_whitespace(root);
    Ok((doc, root))
}

fn namespace_for(xot: &Xot, context: Node, prefix: &str) -> Option<xot::NamespaceId> {
    xot.prefix(prefix)
        .and_then(|id| xot.namespace_for_prefix(context, id))
        .or_else(|| well_known_namespace(prefix).and_then(|uri| xot.namespace(uri)))
}

/// Find the name id for a qualified name without creating it.
///
/// Unprefixed names are in no namespace. Returns `None` if the tree has
/// never seen the name, in which case nothing in it can match.
pub fn lookup_name(xot: &Xot, context: Node, qualified: &str) -> Option<NameId> {
    match qualified.split_once(':') {
        Some((prefix, local)) => {
            let ns = namespace_for(xot, context, prefix)?;
            xot.name_ns(local, ns)
        }
        None => xot.name(qualified),
    }
}

/// Get or create the name id for `name`, declaring its prefix on `root` if
/// no ancestor of `root` declares it yet.
pub fn intern_name(xot: &mut Xot, root: Node, name: &QName) -> NameId {
    let Some(prefix) = name.prefix.as_deref() else {
        return xot.add_name(&name.local);
    };

    if let Some(ns) = namespace_for(xot, root, prefix) {
        let declared = xot
            .prefix(prefix)
            .and_then(|id| xot.namespace_for_prefix(root, id))
            .is_some();
        if !declared {
            let prefix_id = xot.add_prefix(prefix);
            xot.set_namespace(root, prefix_id, ns);
        }
        return xot.add_name_ns(&name.local, ns);
    }

    let uri = name
        .namespace
        .clone()
        .or_else(|| well_known_namespace(prefix).map(str::to_string))
        .unwrap_or_else(|| format!("urn:undeclared:{}", prefix));
    let ns = xot.add_namespace(&uri);
    let prefix_id = xot.add_prefix(prefix);
    xot.set_namespace(root, prefix_id, ns);
    xot.add_name_ns(&name.local, ns)
}

/// Render a name id the way it is written at `context`.
pub fn qualified_name(xot: &Xot, context: Node, name: NameId) -> QName {
    let (local, uri) = xot.name_ns_str(name);
    if uri.is_empty() {
        return QName::local(local);
    }
    let prefix = xot
        .namespace(uri)
        .and_then(|ns| xot.prefix_for_namespace(context, ns))
        .map(|id| xot.prefix_str(id).to_string())
        .filter(|prefix| !prefix.is_empty());
    match prefix {
        Some(prefix) => QName {
            prefix: Some(prefix),
            local: local.to_string(),
            namespace: Some(uri.to_string()),
        },
        // default namespace: written without a prefix
        None => QName::local(local),
    }
}

/// Local name of an element node, ignoring its namespace.
pub fn local_name(xot: &Xot, node: Node) -> Option<&str> {
    xot.element(node).map(|e| xot.local_name_str(e.name()))
}

/// Element children of `node` whose local name is `local`.
pub fn child_elements<'a>(
    xot: &'a Xot,
    node: Node,
    local: &'a str,
) -> impl Iterator<Item = Node> + 'a {
    xot.children(node)
        .filter(move |&child| local_name(xot, child) == Some(local))
}

/// Attribute value by local name, ignoring namespaces.
pub fn attribute_local<'a>(xot: &'a Xot, node: Node, local: &str) -> Option<&'a str> {
    xot.attributes(node)
        .iter()
        .find(|(name, _)| xot.local_name_str(*name) == local)
        .map(|(_, value)| value.as_str())
}

/// Concatenated text of the direct text children, trimmed.
pub fn direct_text(xot: &Xot, node: Node) -> Option<String> {
    let text: String = xot
        .children(node)
        .filter_map(|child| xot.text_str(child))
        .collect();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Copy an element subtree into an owned value.
pub fn to_xml_element(xot: &Xot, node: Node) -> Option<XmlElement> {
    let element = xot.element(node)?;
    let attributes = xot
        .attributes(node)
        .iter()
        .map(|(name, value)| (qualified_name(xot, node, name), value.clone()))
        .collect();
    let children = xot
        .children(node)
        .filter_map(|child| to_xml_element(xot, child))
        .collect();
    Some(XmlElement {
        name: qualified_name(xot, node, element.name()),
        attributes,
        text: direct_text(xot, node),
        children,
    })
}

/// Build the subtree for `element` under `parent`.
pub fn append_xml_element(
    xot: &mut Xot,
    root: Node,
    parent: Node,
    element: &XmlElement,
) -> Result<Node, xot::Error> {
    let name = intern_name(xot, root, &element.name);
    let node = xot.new_element(name);
    xot.append(parent, node)?;
    fill_element(xot, root, node, element)?;
    Ok(node)
}

/// Replace the attributes, text and children of `node` with the content of
/// `element`. The element's own name is left alone.
pub fn fill_element(
    xot: &mut Xot,
    root: Node,
    node: Node,
    element: &XmlElement,
) -> Result<(), xot::Error> {
    let attributes: Vec<(NameId, String)> = element
        .attributes
        .iter()
        .map(|(name, value)| (intern_name(xot, root, name), value.clone()))
        .collect();
    {
        let mut map = xot.attributes_mut(node);
        map.clear();
        for (name, value) in attributes {
            map.insert(name, value);
        }
    }

    let existing: Vec<Node> = xot.children(node).collect();
    for child in existing {
        xot.remove(child)?;
    }
    if let Some(text) = &element.text {
        xot.append_text(node, text)?;
    }
    for child in &element.children {
        append_xml_element(xot, root, node, child)?;
    }
    Ok(())
}

/// Pretty print `node` using `unit` for each indentation level.
///
/// `skip_levels` drops that many outer levels of indentation, which lets a
/// property list keep its top-level `<dict>` flush with `<plist>`.
pub fn write_pretty(xot: &Xot, node: Node, unit: &str, skip_levels: usize) -> String {
    let mut out = String::new();
    for (_, _, token) in xot.pretty_tokens(
        node,
        TokenSerializeParameters::default(),
        &[],
        NoopNormalizer,
    ) {
        let level = token.indentation.saturating_sub(skip_levels);
        if token.indentation > 0 && level > 0 {
            out.push_str(&unit.repeat(level));
        }
        if token.space {
            out.push(' ');
        }
        out.push_str(&token.text);
        if token.newline {
            out.push('\n');
        }
    }
    out
}
