//! # Selector Dialect
//!
//! Parent paths inside a tree-structured artifact are written in a small
//! path dialect:
//!
//! - segments separated by `/` (`application/activity`)
//! - `*` matches any child element, `.` is the current node
//! - bracketed attribute predicates: `[@android:name='MainActivity']`,
//!   `[@android:name="MainActivity"]` or a bare presence test `[@android:name]`
//! - a segment made only of predicates applies them to the previous step
//!   (`activity/[@android:name='X']` is the same as `activity[@android:name='X']`)
//! - the `{ActivityName}` placeholder, substituted with each legacy spelling
//!   of the entry activity while the selector is resolved against a live tree
//!
//! An empty parent, `/*` and `*/` all mean the artifact's root element.
//! A leading `/` makes the selector absolute: its first step names the root
//! element itself.

use std::fmt;

use crate::error::{Error, Result};

/// Placeholder for the application's entry activity name.
pub const ACTIVITY_PLACEHOLDER: &str = "{ActivityName}";

/// Spellings of the entry activity, in the order they are tried.
pub const LEGACY_ACTIVITY_NAMES: [&str; 2] = ["CordovaApp", "MainActivity"];

/// One path step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub test: NodeTest,
    pub predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// `.`: the node the step starts from.
    Current,
    /// `*`: every child element.
    Any,
    /// A child element with this qualified name.
    Named(String),
}

/// `[@attribute='value']`, or `[@attribute]` when `value` is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub attribute: String,
    pub value: Option<String>,
}

/// A parsed parent path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub absolute: bool,
    pub steps: Vec<Step>,
}

impl Selector {
    /// The selector for the root element itself.
    pub fn root() -> Self {
        Self {
            absolute: false,
            steps: Vec::new(),
        }
    }

    /// Parse a selector string.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if matches!(trimmed, "" | "/*" | "*/" | "." | "./") {
            return Ok(Self::root());
        }

        let absolute = trimmed.starts_with('/') && !trimmed.starts_with("//");
        let mut rest = trimmed.trim_start_matches('/');
        while let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        }

        let mut steps: Vec<Step> = Vec::new();
        for segment in split_segments(input, rest)? {
            if segment.is_empty() || segment == "." {
                continue;
            }
            if segment.starts_with('[') {
                let predicates = parse_predicates(input, &segment)?;
                match steps.last_mut() {
                    Some(step) => step.predicates.extend(predicates),
                    None => steps.push(Step {
                        test: NodeTest::Current,
                        predicates,
                    }),
                }
                continue;
            }
            let (name, predicate_text) = match segment.find('[') {
                Some(index) => segment.split_at(index),
                None => (segment.as_str(), ""),
            };
            let test = if name == "*" {
                NodeTest::Any
            } else if name == "." {
                NodeTest::Current
            } else if is_valid_name(name) {
                NodeTest::Named(name.to_string())
            } else {
                return Err(selector_error(input, format!("invalid element name '{}'", name)));
            };
            steps.push(Step {
                test,
                predicates: parse_predicates(input, predicate_text)?,
            });
        }

        Ok(Self { absolute, steps })
    }

    #[cfg(test)]
    pub(crate) fn is_root(&self) -> bool {
        self.steps
            .iter()
            .all(|step| step.test == NodeTest::Current && step.predicates.is_empty())
    }

    /// The same path searched from every child of the root (`*/` prefix).
    pub fn one_level_down(&self) -> Self {
        let mut steps = Vec::with_capacity(self.steps.len() + 1);
        steps.push(Step {
            test: NodeTest::Any,
            predicates: Vec::new(),
        });
        steps.extend(self.steps.iter().cloned());
        Self {
            absolute: false,
            steps,
        }
    }

    pub fn has_placeholder(&self) -> bool {
        self.steps.iter().any(|step| {
            matches!(&step.test, NodeTest::Named(name) if name.contains(ACTIVITY_PLACEHOLDER))
                || step.predicates.iter().any(|p| {
                    p.value
                        .as_deref()
                        .is_some_and(|v| v.contains(ACTIVITY_PLACEHOLDER))
                })
        })
    }

    /// Substitute the entry activity placeholder with `activity`.
    pub fn with_activity(&self, activity: &str) -> Self {
        let steps = self
            .steps
            .iter()
            .map(|step| Step {
                test: match &step.test {
                    NodeTest::Named(name) => {
                        NodeTest::Named(name.replace(ACTIVITY_PLACEHOLDER, activity))
                    }
                    other => other.clone(),
                },
                predicates: step
                    .predicates
                    .iter()
                    .map(|p| Predicate {
                        attribute: p.attribute.clone(),
                        value: p
                            .value
                            .as_ref()
                            .map(|v| v.replace(ACTIVITY_PLACEHOLDER, activity)),
                    })
                    .collect(),
            })
            .collect();
        Self {
            absolute: self.absolute,
            steps,
        }
    }

    /// Resolve an absolute selector against the name of the root element.
    ///
    /// Returns `None` when the first step does not accept the root.
    pub fn relative_to_root(&self, root_name: &str) -> Option<Self> {
        if !self.absolute {
            return Some(self.clone());
        }
        let Some((first, rest)) = self.steps.split_first() else {
            return Some(Self::root());
        };
        let accepts = match &first.test {
            NodeTest::Named(name) => name == root_name,
            NodeTest::Any | NodeTest::Current => true,
        };
        if !accepts {
            return None;
        }
        let mut steps = Vec::with_capacity(rest.len() + 1);
        if !first.predicates.is_empty() {
            steps.push(Step {
                test: NodeTest::Current,
                predicates: first.predicates.clone(),
            });
        }
        steps.extend(rest.iter().cloned());
        Some(Self {
            absolute: false,
            steps,
        })
    }

    /// Split off the last step, leaving the selector of its parent.
    #[cfg(test)]
    pub(crate) fn split_last(&self) -> Option<(Self, Step)> {
        let (last, init) = self.steps.split_last()?;
        Some((
            Self {
                absolute: self.absolute,
                steps: init.to_vec(),
            },
            last.clone(),
        ))
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.test {
            NodeTest::Current => f.write_str(".")?,
            NodeTest::Any => f.write_str("*")?,
            NodeTest::Named(name) => f.write_str(name)?,
        }
        for predicate in &self.predicates {
            match &predicate.value {
                Some(value) => write!(f, "[@{}='{}']", predicate.attribute, value)?,
                None => write!(f, "[@{}]", predicate.attribute)?,
            }
        }
        Ok(())
    }
}

/// Canonical form: `.` for the root, otherwise steps joined by `/` with
/// predicates attached to their step.
impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str(if self.absolute { "/" } else { "." });
        }
        if self.absolute {
            f.write_str("/")?;
        }
        for (index, step) in self.steps.iter().enumerate() {
            if index > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

fn selector_error(selector: &str, message: String) -> Error {
    Error::Selector {
        selector: selector.to_string(),
        message,
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '{' | '}'))
}

/// Split on `/` outside of brackets and quotes.
fn split_segments(original: &str, path: &str) -> Result<Vec<String>> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for c in path.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') if depth > 0 => {
                quote = Some(c);
                current.push(c);
            }
            (None, '[') => {
                depth += 1;
                current.push(c);
            }
            (None, ']') => {
                if depth == 0 {
                    return Err(selector_error(original, "unbalanced ']'".to_string()));
                }
                depth -= 1;
                current.push(c);
            }
            (None, '/') if depth == 0 => segments.push(std::mem::take(&mut current)),
            (None, c) => current.push(c),
        }
    }

    if quote.is_some() {
        return Err(selector_error(original, "unterminated quote".to_string()));
    }
    if depth > 0 {
        return Err(selector_error(original, "unclosed '['".to_string()));
    }
    segments.push(current);
    Ok(segments)
}

fn parse_predicates(original: &str, mut text: &str) -> Result<Vec<Predicate>> {
    let mut predicates = Vec::new();
    while !text.is_empty() {
        let body_end = find_closing_bracket(text)
            .ok_or_else(|| selector_error(original, "unclosed '['".to_string()))?;
        let body = text[1..body_end].trim();
        predicates.push(parse_predicate(original, body)?);
        text = &text[body_end + 1..];
    }
    Ok(predicates)
}

fn find_closing_bracket(text: &str) -> Option<usize> {
    if !text.starts_with('[') {
        return None;
    }
    let mut quote: Option<char> = None;
    for (index, c) in text.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, ']') => return Some(index),
            _ => {}
        }
    }
    None
}

fn parse_predicate(original: &str, body: &str) -> Result<Predicate> {
    let body = body.strip_prefix('@').ok_or_else(|| {
        selector_error(
            original,
            format!("predicate '[{}]' must test an attribute with '@'", body),
        )
    })?;

    let (attribute, value) = match body.split_once('=') {
        Some((attribute, raw)) => {
            let raw = raw.trim();
            let unquoted = raw
                .strip_prefix('\'')
                .and_then(|v| v.strip_suffix('\''))
                .or_else(|| raw.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
                .ok_or_else(|| {
                    selector_error(original, format!("predicate value {} must be quoted", raw))
                })?;
            (attribute.trim(), Some(unquoted.to_string()))
        }
        None => (body.trim(), None),
    };

    if !is_valid_name(attribute) {
        return Err(selector_error(
            original,
            format!("invalid attribute name '{}'", attribute),
        ));
    }

    Ok(Predicate {
        attribute: attribute.to_string(),
        value,
    })
}
