//! iOS `.xcconfig` merge operations
//!
//! Override files are flat `NAME = value` lines. Each file has a build type
//! taken from its name (`build-debug` is debug, `build-release` is release,
//! the others have none), and a setting only lands in files whose build type
//! equals the item's (no `buildType` means none).
//!
//! Within a matching file an existing line is replaced unless
//! `xcconfigEnforce="false"`; a missing line is appended only when
//! `xcconfigEnforce="true"`. A debug `CODE_SIGN_IDENTITY` also replaces the
//! line in `build.xcconfig`, where the default debug identity lives.

use std::path::Path;

use regex::{NoExpand, Regex};

use crate::error::{Error, Result};
use crate::model::{BuildVariant, MergeItem, Operation, PreferenceEntry};
use crate::platform::XcConfigFile;

use super::FormatAdapter;

/// Adapter for one of the override files.
pub struct XcConfigAdapter {
    file: XcConfigFile,
}

impl XcConfigAdapter {
    pub fn new(file: XcConfigFile) -> Self {
        Self { file }
    }

    fn same_build_type(&self, entry: &PreferenceEntry) -> bool {
        match (&entry.build_variant, self.file.build_variant()) {
            (None, None) => true,
            (Some(item), Some(file)) => item == &file,
            _ => false,
        }
    }
}

/// What to do with one setting in one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Replace,
    Append,
    Leave,
}

fn setting_line(name: &str) -> Result<Regex> {
    let pattern = format!(r#"(?m)^"?{}"?[ \t]*=[^\r\n]*"#, regex::escape(name));
    Regex::new(&pattern).map_err(Error::Regex)
}

impl FormatAdapter for XcConfigAdapter {
    type Doc = String;
    type Parent = ();

    fn load(&self, _path: &Path, content: &str) -> Result<String> {
        Ok(content.to_string())
    }

    fn locate_parent(&self, _doc: &mut String, _item: &MergeItem) -> Result<Option<()>> {
        Ok(Some(()))
    }

    fn apply_item(&self, doc: &mut String, _parent: (), item: &MergeItem) -> Result<bool> {
        if item.operation != Operation::BuildSetting {
            return Ok(false);
        }
        let Some(entry) = item.preference() else {
            return Ok(false);
        };
        let name = item.element_name.as_str();
        let line = setting_line(name)?;
        let present = line.is_match(doc);

        let action = if self.same_build_type(entry) {
            if present && entry.enforce != Some(false) {
                Action::Replace
            } else if entry.enforce == Some(true) {
                Action::Append
            } else {
                Action::Leave
            }
        } else if name.contains("CODE_SIGN_IDENTITY")
            && entry.build_variant == Some(BuildVariant::Debug)
            && self.file.build_variant().is_none()
            && entry.enforce.is_none()
            && present
        {
            Action::Replace
        } else {
            Action::Leave
        };

        let setting = format!("{} = {}", name, entry.value);
        match action {
            Action::Replace => {
                *doc = line.replace(doc, NoExpand(&setting)).into_owned();
                log::debug!(
                    "Overwrote {} with '{}' in {}",
                    name,
                    entry.value,
                    self.file.file_name()
                );
            }
            Action::Append => {
                if !doc.is_empty() && !doc.ends_with('\n') {
                    doc.push('\n');
                }
                doc.push_str(&setting);
                doc.push('\n');
                log::debug!("Appended {} to {}", setting, self.file.file_name());
            }
            Action::Leave => return Ok(false),
        }
        Ok(true)
    }

    fn serialize(&self, doc: &String) -> Result<String> {
        Ok(doc.clone())
    }
}
