//! # Custom Config Library
//!
//! Merges declarative customisations from a Cordova project's `config.xml`
//! into the native files each platform generates:
//!
//! - Android: `AndroidManifest.xml`
//! - iOS: `<name>-Info.plist`, `project.pbxproj` and the `cordova/*.xcconfig`
//!   override files
//!
//! ## Quick Example
//!
//! ```
//! use std::path::Path;
//! use custom_config::manifest::Manifest;
//! use custom_config::resolver;
//!
//! let manifest = Manifest::parse(
//!     Path::new("config.xml"),
//!     r#"<widget>
//!         <platform name="android">
//!             <preference name="android-manifest-hardwareAccelerated" value="true"/>
//!         </platform>
//!     </widget>"#,
//! )
//! .unwrap();
//!
//! let entries = manifest.read_entries("android");
//! let plans = resolver::resolve_platform("android", &entries);
//! assert_eq!(plans.len(), 1);
//! assert_eq!(plans[0].items[0].element_name, "android:hardwareAccelerated");
//! ```
//!
//! ## Core Concepts
//!
//! - **Manifest (`manifest`)**: reads `config.xml` into preferences and
//!   `<config-file>` fragments, per platform.
//! - **Resolver (`resolver`, `selector`)**: turns those entries into
//!   [`MergeItem`](model::MergeItem)s, each naming an artifact, a parent
//!   selector and an operation.
//! - **Format adapters (`merge`)**: one per artifact kind, behind the
//!   [`FormatAdapter`](merge::FormatAdapter) trait.
//! - **Backups (`backup`, `restore`)**: a pristine snapshot of every artifact
//!   is taken before its first modification and can be copied back.
//!
//! ## Execution Flow
//!
//! [`merge::apply`] runs one invocation:
//!
//! 1.  **Restore**: copy snapshots back over the live artifacts, so every
//!     run starts from the pristine files.
//! 2.  **Resolve**: read the platform's entries and group merge items per
//!     artifact.
//! 3.  **Merge**: load, apply and serialize each artifact; write it only if
//!     it changed, after snapshotting it.
//!
//! Every platform runs inside its own failure boundary; the outcome is
//! collected in a [`report::MergeReport`].

pub mod backup;
pub mod context;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod merge;
pub mod model;
pub mod output;
pub mod platform;
pub mod report;
pub mod resolver;
pub mod restore;
pub mod selector;
pub mod xml;

#[cfg(test)]
mod selector_proptest;

pub use context::{RunContext, RunOptions};
pub use error::{Error, Result};
