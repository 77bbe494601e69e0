//! iOS `project.pbxproj` merge operations
//!
//! Only the `XCBuildConfiguration` section is read. Each configuration
//! block's `buildSettings` dictionary is located with a small lexer for the
//! old-style property list syntax Xcode writes; edits are applied to the
//! original text so everything outside the changed settings is preserved
//! byte for byte.
//!
//! Within the blocks of the item's build variant (all blocks when it has
//! none), a setting is replaced where the block already declares it,
//! literally or quoted, and added where it does not. A setting no block
//! declares therefore lands in every block of that variant.

use std::ops::Range;
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{MergeItem, Operation};

use super::FormatAdapter;

const SECTION: &str = "XCBuildConfiguration";
const SECTION_BEGIN: &str = "/* Begin XCBuildConfiguration section */";
const SECTION_END: &str = "/* End XCBuildConfiguration section */";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Word,
    Quoted,
    Punct(u8),
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    span: Range<usize>,
}

/// Split `src[range]` into tokens, dropping whitespace and comments.
/// Spans are offsets into `src`.
fn tokenize(src: &str, range: Range<usize>) -> std::result::Result<Vec<Token>, String> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = range.start;

    while pos < range.end {
        let b = bytes[pos];
        if b.is_ascii_whitespace() {
            pos += 1;
        } else if bytes[pos..].starts_with(b"/*") {
            let end = src[pos + 2..range.end]
                .find("*/")
                .ok_or_else(|| format!("unterminated comment at offset {}", pos))?;
            pos += end + 4;
        } else if bytes[pos..].starts_with(b"//") {
            pos = src[pos..range.end]
                .find('\n')
                .map_or(range.end, |nl| pos + nl + 1);
        } else if b == b'"' {
            let start = pos;
            pos += 1;
            loop {
                match bytes.get(pos) {
                    Some(b'\\') => pos += 2,
                    Some(b'"') => break,
                    Some(_) => pos += 1,
                    None => return Err(format!("unterminated string at offset {}", start)),
                }
                if pos >= range.end {
                    return Err(format!("unterminated string at offset {}", start));
                }
            }
            pos += 1;
            tokens.push(Token {
                kind: TokenKind::Quoted,
                span: start..pos,
            });
        } else if b"{}();=,".contains(&b) {
            tokens.push(Token {
                kind: TokenKind::Punct(b),
                span: pos..pos + 1,
            });
            pos += 1;
        } else {
            let start = pos;
            while pos < range.end
                && !bytes[pos].is_ascii_whitespace()
                && !b"{}();=,\"".contains(&bytes[pos])
                && !bytes[pos..].starts_with(b"/*")
            {
                pos += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Word,
                span: start..pos,
            });
        }
    }
    Ok(tokens)
}

#[derive(Debug)]
enum Value {
    Scalar(Range<usize>),
    Dict(Dict),
    /// The whole `( ... )`, parentheses included.
    List(Range<usize>),
}

impl Value {
    /// The text the value occupies, delimiters included.
    fn span(&self) -> Range<usize> {
        match self {
            Value::Scalar(span) | Value::List(span) => span.clone(),
            Value::Dict(dict) => dict.open..dict.close + 1,
        }
    }
}

#[derive(Debug)]
struct Dict {
    entries: Vec<(Range<usize>, Value)>,
    /// Offset of the opening `{`.
    open: usize,
    /// Offset of the closing `}`.
    close: usize,
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn next(&mut self) -> std::result::Result<Token, String> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| "unexpected end of section".to_string())?;
        self.pos += 1;
        Ok(token)
    }

    fn peek_punct(&self, punct: u8) -> bool {
        matches!(self.tokens.get(self.pos), Some(t) if t.kind == TokenKind::Punct(punct))
    }

    fn expect(&mut self, punct: u8) -> std::result::Result<(), String> {
        let token = self.next()?;
        if token.kind == TokenKind::Punct(punct) {
            Ok(())
        } else {
            Err(format!(
                "expected '{}' at offset {}, found '{}'",
                punct as char,
                token.span.start,
                &self.src[token.span.clone()]
            ))
        }
    }

    fn key(&mut self) -> std::result::Result<Range<usize>, String> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Word | TokenKind::Quoted => Ok(token.span),
            TokenKind::Punct(p) => Err(format!(
                "expected a key at offset {}, found '{}'",
                token.span.start, p as char
            )),
        }
    }

    fn value(&mut self) -> std::result::Result<Value, String> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Word | TokenKind::Quoted => Ok(Value::Scalar(token.span)),
            TokenKind::Punct(b'{') => {
                let mut entries = Vec::new();
                while !self.peek_punct(b'}') {
                    let key = self.key()?;
                    self.expect(b'=')?;
                    let value = self.value()?;
                    self.expect(b';')?;
                    entries.push((key, value));
                }
                let close = self.next()?.span.start;
                Ok(Value::Dict(Dict {
                    entries,
                    open: token.span.start,
                    close,
                }))
            }
            TokenKind::Punct(b'(') => {
                while !self.peek_punct(b')') {
                    self.value()?;
                    if !self.peek_punct(b')') {
                        self.expect(b',')?;
                    }
                }
                let close = self.next()?.span.end;
                Ok(Value::List(token.span.start..close))
            }
            TokenKind::Punct(p) => Err(format!(
                "unexpected '{}' at offset {}",
                p as char, token.span.start
            )),
        }
    }
}

/// One `XCBuildConfiguration` block.
#[derive(Debug)]
pub struct BuildBlock {
    pub id: String,
    /// The configuration name (`Debug`, `Release`, ...).
    pub name: String,
    /// Setting keys as written, quotes included, with the span of their
    /// whole value (scalar, list or dictionary).
    settings: Vec<(String, Range<usize>)>,
    /// Offset of the closing `}` of `buildSettings`.
    close: usize,
}

fn unquote(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

/// Parse every configuration block of the `XCBuildConfiguration` section.
pub fn parse_configurations(src: &str) -> std::result::Result<Vec<BuildBlock>, String> {
    let begin = src
        .find(SECTION_BEGIN)
        .ok_or_else(|| "no XCBuildConfiguration section".to_string())?
        + SECTION_BEGIN.len();
    let end = src[begin..]
        .find(SECTION_END)
        .ok_or_else(|| "XCBuildConfiguration section is not closed".to_string())?
        + begin;

    let mut parser = Parser {
        src,
        tokens: tokenize(src, begin..end)?,
        pos: 0,
    };
    let mut blocks = Vec::new();
    while parser.pos < parser.tokens.len() {
        let id = parser.key()?;
        parser.expect(b'=')?;
        let value = parser.value()?;
        parser.expect(b';')?;

        let Value::Dict(block) = value else {
            continue;
        };
        let mut name = None;
        let mut settings = None;
        for (key, value) in block.entries {
            match (unquote(&src[key]), value) {
                ("name", Value::Scalar(span)) => name = Some(unquote(&src[span]).to_string()),
                ("buildSettings", Value::Dict(dict)) => settings = Some(dict),
                _ => {}
            }
        }
        let (Some(name), Some(settings)) = (name, settings) else {
            continue;
        };
        blocks.push(BuildBlock {
            id: src[id].to_string(),
            name,
            settings: settings
                .entries
                .into_iter()
                .map(|(key, value)| (src[key].to_string(), value.span()))
                .collect(),
            close: settings.close,
        });
    }
    Ok(blocks)
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\\\""))
}

/// A parsed project file.
pub struct ProjectDoc {
    path: String,
    text: String,
}

impl ProjectDoc {
    fn blocks(&self) -> Result<Vec<BuildBlock>> {
        parse_configurations(&self.text).map_err(|message| Error::ExternalTool {
            path: self.path.clone(),
            message,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Adapter for `project.pbxproj`.
pub struct ProjectFileAdapter;

impl FormatAdapter for ProjectFileAdapter {
    type Doc = ProjectDoc;
    type Parent = Vec<BuildBlock>;

    fn load(&self, path: &Path, content: &str) -> Result<ProjectDoc> {
        let doc = ProjectDoc {
            path: path.display().to_string(),
            text: content.to_string(),
        };
        doc.blocks()?;
        Ok(doc)
    }

    fn locate_parent(
        &self,
        doc: &mut ProjectDoc,
        item: &MergeItem,
    ) -> Result<Option<Vec<BuildBlock>>> {
        if item.parent != SECTION {
            return Ok(None);
        }
        let variant = item.preference().and_then(|p| p.build_variant.as_ref());
        let blocks: Vec<BuildBlock> = doc
            .blocks()?
            .into_iter()
            .filter(|block| variant.is_none_or(|v| v.matches(&block.name)))
            .collect();
        Ok(if blocks.is_empty() { None } else { Some(blocks) })
    }

    fn apply_item(
        &self,
        doc: &mut ProjectDoc,
        blocks: Vec<BuildBlock>,
        item: &MergeItem,
    ) -> Result<bool> {
        if item.operation != Operation::BuildSetting {
            return Ok(false);
        }
        let entry = item.preference().ok_or_else(|| Error::InvalidPayload {
            artifact: "project.pbxproj".to_string(),
            message: "expected a preference".to_string(),
        })?;
        let name = item.element_name.as_str();
        let quoted_name = quote(name);
        let mode = entry.quote_mode();
        let value = if mode.quotes_value() {
            quote(&entry.value)
        } else {
            entry.value.clone()
        };

        let key = if mode.quotes_key() {
            quoted_name.clone()
        } else {
            name.to_string()
        };

        let mut edits: Vec<(Range<usize>, String)> = Vec::with_capacity(blocks.len());
        for block in &blocks {
            match block
                .settings
                .iter()
                .find(|(existing, _)| existing == name || *existing == quoted_name)
            {
                Some((existing, span)) => {
                    log::debug!(
                        "replace XCBuildConfiguration key={{ {} }} to value={{ {} }} for build type='{}' in block='{}'",
                        existing, value, block.name, block.id
                    );
                    edits.push((span.clone(), value.clone()));
                }
                None => {
                    log::debug!(
                        "add XCBuildConfiguration key={{ {} }} to value={{ {} }} for build type='{}' in block='{}'",
                        key, value, block.name, block.id
                    );
                    edits.push(insertion(&doc.text, block.close, &key, &value));
                }
            }
        }

        edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
        for (span, replacement) in edits {
            doc.text.replace_range(span, &replacement);
        }
        Ok(true)
    }

    fn serialize(&self, doc: &ProjectDoc) -> Result<String> {
        Ok(doc.text.clone())
    }
}

/// A new `key = value;` line just before the `}` at `close`, indented one
/// level deeper than the brace.
fn insertion(text: &str, close: usize, key: &str, value: &str) -> (Range<usize>, String) {
    match text[..close].rfind('\n') {
        Some(nl) if text[nl + 1..close].trim().is_empty() => {
            let indent = &text[nl + 1..close];
            (
                nl + 1..nl + 1,
                format!("{}\t{} = {};\n", indent, key, value),
            )
        }
        _ => (close..close, format!("{} = {}; ", key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BuildVariant, Payload, PreferenceEntry, QuoteMode};
    use crate::platform::Artifact;
    use pretty_assertions::assert_eq;

    const PROJECT: &str = r#"// !$*UTF8*$!
{
	objects = {
/* Begin XCBuildConfiguration section */
		1D6058940D05DD3E006BFB54 /* Debug */ = {
			isa = XCBuildConfiguration;
			buildSettings = {
				ALWAYS_SEARCH_USER_PATHS = NO;
				"CODE_SIGN_IDENTITY[sdk=iphoneos*]" = "iPhone Developer";
				GCC_PREPROCESSOR_DEFINITIONS = (
					"DEBUG=1",
					"$(inherited)",
				);
				TARGETED_DEVICE_FAMILY = "1,2";
			};
			name = Debug;
		};
		1D6058950D05DD3E006BFB54 /* Release */ = {
			isa = XCBuildConfiguration;
			buildSettings = {
				ALWAYS_SEARCH_USER_PATHS = NO;
				TARGETED_DEVICE_FAMILY = "1,2";
			};
			name = Release;
		};
/* End XCBuildConfiguration section */
	};
	rootObject = 29B97313FDCFA39411CA2CEA /* Project object */;
}
"#;

    fn load() -> ProjectDoc {
        ProjectFileAdapter
            .load(Path::new("Demo.xcodeproj/project.pbxproj"), PROJECT)
            .unwrap()
    }

    fn setting(name: &str, value: &str) -> PreferenceEntry {
        PreferenceEntry::new(format!("ios-XCBuildConfiguration-{}", name), value)
    }

    fn item(name: &str, entry: PreferenceEntry) -> MergeItem {
        MergeItem {
            artifact: Artifact::ProjectFile,
            parent: SECTION.to_string(),
            operation: Operation::BuildSetting,
            element_name: name.to_string(),
            payload: Payload::Preference(entry),
            uniqueness_key: None,
            force_append: false,
        }
    }

    fn apply(doc: &mut ProjectDoc, item: &MergeItem) -> bool {
        match ProjectFileAdapter.locate_parent(doc, item).unwrap() {
            Some(blocks) => ProjectFileAdapter.apply_item(doc, blocks, item).unwrap(),
            None => false,
        }
    }

    #[test]
    fn test_parse_blocks() {
        let blocks = parse_configurations(PROJECT).unwrap();
        let names: Vec<&str> = blocks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Debug", "Release"]);
        let keys: Vec<&str> = blocks[0].settings.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "ALWAYS_SEARCH_USER_PATHS",
                "\"CODE_SIGN_IDENTITY[sdk=iphoneos*]\"",
                "GCC_PREPROCESSOR_DEFINITIONS",
                "TARGETED_DEVICE_FAMILY"
            ]
        );
        let (_, span) = &blocks[0].settings[2];
        assert!(PROJECT[span.clone()].starts_with('('));
        assert!(PROJECT[span.clone()].ends_with(')'));
    }

    #[test]
    fn test_replace_in_every_block() {
        let mut doc = load();
        assert!(apply(&mut doc, &item("TARGETED_DEVICE_FAMILY", setting("TARGETED_DEVICE_FAMILY", "1"))));
        assert_eq!(doc.text().matches("TARGETED_DEVICE_FAMILY = \"1\";").count(), 2);
        assert!(!doc.text().contains("\"1,2\""));
    }

    #[test]
    fn test_replace_quoted_key_keeps_key_form() {
        let mut doc = load();
        let mut entry = setting("CODE_SIGN_IDENTITY[sdk=iphoneos*]", "iPhone Distribution");
        entry.build_variant = Some(BuildVariant::Debug);
        apply(&mut doc, &item("CODE_SIGN_IDENTITY[sdk=iphoneos*]", entry));
        assert!(doc
            .text()
            .contains("\"CODE_SIGN_IDENTITY[sdk=iphoneos*]\" = \"iPhone Distribution\";"));
    }

    #[test]
    fn test_replace_then_add_across_blocks() {
        let mut doc = load();
        let name = "CODE_SIGN_IDENTITY[sdk=iphoneos*]";
        apply(&mut doc, &item(name, setting(name, "Apple Development")));
        assert_eq!(
            doc.text()
                .matches("\"CODE_SIGN_IDENTITY[sdk=iphoneos*]\" = \"Apple Development\";")
                .count(),
            2
        );
        assert!(!doc.text().contains("iPhone Developer"));
        assert!(doc.text().contains(
            "\"CODE_SIGN_IDENTITY[sdk=iphoneos*]\" = \"Apple Development\";\n\t\t\t};\n\t\t\tname = Release;"
        ));
    }

    #[test]
    fn test_list_valued_setting_is_replaced_not_duplicated() {
        let mut doc = load();
        let name = "GCC_PREPROCESSOR_DEFINITIONS";
        let mut entry = setting(name, "DEBUG=1");
        entry.build_variant = Some(BuildVariant::Debug);
        assert!(apply(&mut doc, &item(name, entry)));
        assert_eq!(doc.text().matches(name).count(), 1);
        assert!(doc
            .text()
            .contains("GCC_PREPROCESSOR_DEFINITIONS = \"DEBUG=1\";\n\t\t\t\tTARGETED_DEVICE_FAMILY"));
        assert!(!doc.text().contains("$(inherited)"));
        assert!(parse_configurations(doc.text()).is_ok());
    }

    #[test]
    fn test_add_when_absent_respects_variant() {
        let mut doc = load();
        let mut entry = setting("ENABLE_BITCODE", "NO");
        entry.build_variant = Some(BuildVariant::Release);
        entry.quote = Some(QuoteMode::None);
        apply(&mut doc, &item("ENABLE_BITCODE", entry));
        assert_eq!(doc.text().matches("ENABLE_BITCODE = NO;").count(), 1);
        assert!(doc.text().contains(
            "\t\t\t\tTARGETED_DEVICE_FAMILY = \"1,2\";\n\t\t\t\tENABLE_BITCODE = NO;\n\t\t\t};\n\t\t\tname = Release;"
        ));
    }

    #[test]
    fn test_add_quotes_both_by_default() {
        let mut doc = load();
        apply(&mut doc, &item("OTHER_LDFLAGS", setting("OTHER_LDFLAGS", "-ObjC")));
        assert_eq!(doc.text().matches("\"OTHER_LDFLAGS\" = \"-ObjC\";").count(), 2);
    }

    #[test]
    fn test_quote_key_only() {
        let mut doc = load();
        let mut entry = setting("SWIFT_VERSION", "5.0");
        entry.quote = Some(QuoteMode::Key);
        apply(&mut doc, &item("SWIFT_VERSION", entry));
        assert!(doc.text().contains("\"SWIFT_VERSION\" = 5.0;"));
    }

    #[test]
    fn test_reapply_is_idempotent() {
        let mut doc = load();
        let item = item("OTHER_LDFLAGS", setting("OTHER_LDFLAGS", "-ObjC"));
        apply(&mut doc, &item);
        let once = doc.text().to_string();
        apply(&mut doc, &item);
        assert_eq!(doc.text(), once);
    }

    #[test]
    fn test_unknown_variant_is_unresolved() {
        let mut doc = load();
        let mut entry = setting("ENABLE_BITCODE", "NO");
        entry.build_variant = Some(BuildVariant::parse("Staging"));
        let item = item("ENABLE_BITCODE", entry);
        assert!(ProjectFileAdapter.locate_parent(&mut doc, &item).unwrap().is_none());
    }

    #[test]
    fn test_untouched_text_is_preserved() {
        let mut doc = load();
        apply(&mut doc, &item("TARGETED_DEVICE_FAMILY", setting("TARGETED_DEVICE_FAMILY", "1")));
        assert!(doc.text().starts_with("// !$*UTF8*$!\n{\n\tobjects = {\n"));
        assert!(doc.text().contains("\"$(inherited)\",\n\t\t\t\t);"));
        assert!(doc.text().ends_with("rootObject = 29B97313FDCFA39411CA2CEA /* Project object */;\n}\n"));
    }

    #[test]
    fn test_malformed_project_is_external_tool_error() {
        let err = ProjectFileAdapter
            .load(Path::new("project.pbxproj"), "{ objects = { }; }")
            .err()
            .unwrap();
        assert!(matches!(err, Error::ExternalTool { .. }));

        let broken = PROJECT.replace("name = Release;", "name = ;");
        let err = ProjectFileAdapter
            .load(Path::new("project.pbxproj"), &broken)
            .err()
            .unwrap();
        assert!(matches!(err, Error::ExternalTool { .. }));
    }
}
