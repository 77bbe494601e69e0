//! # Logging
//!
//! Installs `env_logger` behind the `log` facade. Every line is prefixed
//! with the plugin id and coloured by severity when colour is enabled:
//!
//! | Level   | Colour |
//! |---------|--------|
//! | `debug` | green  |
//! | `info`  | blue   |
//! | `warn`  | yellow |
//! | `error` | red    |
//!
//! Output goes to stderr so a JSON report on stdout stays machine-readable.

use std::io::Write;

use console::style;
use log::{Level, LevelFilter};

use crate::output::OutputConfig;

/// Parse a `--log-level` value, falling back to `info`.
pub fn parse_level(level: &str) -> LevelFilter {
    level.trim().parse().unwrap_or(LevelFilter::Info)
}

/// Render one log line.
pub fn format_line(prefix: &str, level: Level, message: &str, use_color: bool) -> String {
    let line = format!("{}: {}", prefix, message);
    let styled = match level {
        Level::Error => style(line).red(),
        Level::Warn => style(line).yellow(),
        Level::Info => style(line).blue(),
        Level::Debug => style(line).green(),
        Level::Trace => style(line).dim(),
    };
    styled.force_styling(use_color).to_string()
}

/// Install the global logger. Calling this twice is harmless; the second
/// call leaves the first logger in place.
pub fn init(prefix: &str, level: LevelFilter, output: &OutputConfig) {
    let prefix = prefix.to_string();
    let use_color = output.use_color;
    let result = env_logger::Builder::new()
        .filter_level(level)
        .target(env_logger::Target::Stderr)
        .format(move |buf, record| {
            writeln!(
                buf,
                "{}",
                format_line(&prefix, record.level(), &record.args().to_string(), use_color)
            )
        })
        .try_init();
    if result.is_err() {
        log::debug!("Logger already initialised");
    }
}
