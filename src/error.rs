//! # Error Handling
//!
//! This module defines the centralized error type for the `custom-config`
//! merge engine. It uses `thiserror` to build a single `Error` enum covering
//! every failure the engine can hit, from reading `config.xml` to writing a
//! patched platform artifact.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Each variant carries the context needed to
//!   explain the failure (artifact name, file path, selector).
//! - **`Severity`**: How far a failure propagates. The merge driver uses it
//!   to decide whether to skip an item, abandon an artifact, or stop the
//!   platform.
//! - **`Result<T>`**: Alias for `std::result::Result<T, Error>`.
//!
//! ## Propagation
//!
//! | Variant              | Severity  | Effect                                     |
//! |----------------------|-----------|--------------------------------------------|
//! | `ManifestParse`      | `Fatal`   | aborts the whole run                        |
//! | `TargetNotFound`     | `Skip`    | artifact skipped                            |
//! | `SelectorUnresolved` | `Skip`    | item skipped, logged at debug level         |
//! | `Selector`           | `Skip`    | item skipped                                |
//! | `InvalidPayload`     | `Skip`    | item skipped                                |
//! | `ExternalTool`       | `Abandon` | artifact abandoned, platform continues      |
//! | `AdapterWrite`       | `Fatal`   | platform stops                              |
//! | `ArtifactParse`      | `Fatal`   | platform stops                              |
//! | `Platform`           | `Fatal`   | raised by the stop-on-error boundary        |

use thiserror::Error;

/// Main error type for custom-config operations
#[derive(Error, Debug)]
pub enum Error {
    /// The project descriptor (`config.xml`) is missing or malformed.
    #[error("Failed to parse {path}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ManifestParse {
        path: String,
        message: String,
        /// Optional hint for how to fix the descriptor
        hint: Option<String>,
    },

    /// No artifact exists at the path computed for this platform.
    #[error("Target {artifact} not found at {path}")]
    TargetNotFound { artifact: String, path: String },

    /// A parent selector matched nothing in the live artifact, even after
    /// every fallback was tried.
    #[error("Selector '{selector}' did not resolve in {artifact}")]
    SelectorUnresolved { selector: String, artifact: String },

    /// Serializing or writing an artifact failed.
    #[error("Failed to write {path}: {message}")]
    AdapterWrite { path: String, message: String },

    /// The project file could not be understood by the build-settings parser.
    #[error("Malformed project file {path}: {message}")]
    ExternalTool { path: String, message: String },

    /// A selector string is not valid in the supported path dialect.
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// A fragment payload cannot be represented in the target format.
    #[error("Invalid payload for {artifact}: {message}")]
    InvalidPayload { artifact: String, message: String },

    /// A target artifact is not well-formed.
    #[error("Failed to parse {path}: {message}")]
    ArtifactParse { path: String, message: String },

    /// A platform failed while stop-on-error was set.
    #[error("Platform {platform} failed: {message}")]
    Platform { platform: String, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// An XML tree error, wrapped from `xot::Error`.
    #[error("XML error: {0}")]
    Xml(#[from] xot::Error),
}

/// How far an error propagates from the point where it is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The current item or artifact is skipped; the run goes on.
    Skip,
    /// The current artifact is abandoned; other artifacts of the platform
    /// are still merged.
    Abandon,
    /// The current platform stops (or the whole run, for manifest errors).
    Fatal,
}

impl Error {
    /// Classify this error for the per-platform failure boundary.
    pub fn severity(&self) -> Severity {
        match self {
            Error::TargetNotFound { .. }
            | Error::SelectorUnresolved { .. }
            | Error::Selector { .. }
            | Error::InvalidPayload { .. } => Severity::Skip,
            Error::ExternalTool { .. } => Severity::Abandon,
            _ => Severity::Fatal,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
