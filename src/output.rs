//! # Output Configuration
//!
//! Controls whether command summaries and log lines use colour and emoji.
//!
//! ## Respecting User Preferences
//!
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals
//!
//! ## Usage
//!
//! ```rust,ignore
//! use custom_config::output::{OutputConfig, emoji};
//!
//! let config = OutputConfig::from_env_and_flag("auto");
//! eprintln!("{} Restored 2 file(s)", emoji(&config, "♻️", "[RESTORE]"));
//! ```

use std::env;

/// Whether the `apply`, `restore` and `plan` summaries may use colour and emoji.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Build from the `--color` flag value and the environment.
    ///
    /// # Arguments
    /// * `color_flag` - `always`, `never` or `auto`, compared case-insensitively
    ///
    /// # Behavior
    /// - `always` turns colour on, even with `NO_COLOR` set
    /// - `never` turns colour off
    /// - any other value detects from the environment
    ///
    /// Detection turns colour off for `NO_COLOR` (any value), `CLICOLOR=0`
    /// or `TERM=dumb`. Otherwise `CLICOLOR_FORCE` turns it on, and failing
    /// that stderr must be a colour-capable terminal, since summaries and
    /// log lines are both written there.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // presence alone disables, even if empty
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stderr().features().colors_supported()
    }

    /// A configuration with colour always on.
    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    /// A configuration with colour always off.
    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Pick the status marker for a summary line.
///
/// # Arguments
/// * `config` - The output configuration
/// * `emoji_str` - Shown when colour is enabled
/// * `plain` - The bracketed fallback, e.g. `[OK]` or `[SKIP]`
///
/// # Example
/// ```rust,ignore
/// let config = OutputConfig::from_env_and_flag("never");
/// eprintln!("{} android: AndroidManifest.xml modified", emoji(&config, "✅", "[OK]"));
/// ```
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}
