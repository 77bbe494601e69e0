//! # Merge Report
//!
//! Structured record of what a run did, per platform and per artifact.
//! Serializable with `serde` so the CLI can print it as JSON.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::platform::Artifact;

/// What happened to one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactOutcome {
    /// The artifact was rewritten (or would be, in a dry run).
    Modified,
    /// Every item was applied but the serialized output is identical.
    Unchanged,
    /// No file exists at the computed path.
    Missing,
    /// The artifact could not be processed; the platform went on.
    Abandoned,
}

/// An item that was not applied, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedItem {
    pub item: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactReport {
    pub artifact: Artifact,
    pub path: String,
    pub outcome: ArtifactOutcome,
    pub applied: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ArtifactReport {
    pub fn new(artifact: Artifact, path: impl Into<String>, outcome: ArtifactOutcome) -> Self {
        Self {
            artifact,
            path: path.into(),
            outcome,
            applied: 0,
            skipped: Vec::new(),
            message: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformReport {
    pub platform: String,
    pub artifacts: Vec<ArtifactReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlatformReport {
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            artifacts: Vec::new(),
            error: None,
        }
    }

    pub fn modified(&self) -> impl Iterator<Item = &ArtifactReport> {
        self.artifacts
            .iter()
            .filter(|a| a.outcome == ArtifactOutcome::Modified)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub dry_run: bool,
    /// Set when the run was skipped because the stage did not match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    pub platforms: Vec<PlatformReport>,
}

impl MergeReport {
    pub fn failed_platforms(&self) -> impl Iterator<Item = &PlatformReport> {
        self.platforms.iter().filter(|p| p.error.is_some())
    }

    pub fn modified_count(&self) -> usize {
        self.platforms.iter().map(|p| p.modified().count()).sum()
    }

    /// Turn platform failures into an error when stop-on-error is set.
    pub fn check(&self, stop_on_error: bool) -> Result<()> {
        if !stop_on_error {
            return Ok(());
        }
        match self.failed_platforms().next() {
            Some(failed) => Err(Error::Platform {
                platform: failed.platform.clone(),
                message: failed.error.clone().unwrap_or_default(),
            }),
            None => Ok(()),
        }
    }
}
