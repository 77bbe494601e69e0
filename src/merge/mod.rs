//! Merge engine: format adapters and the per-artifact driver
//!
//! Each artifact kind has one adapter implementing [`FormatAdapter`]:
//!
//! - Android manifest (tree_xml.rs) - tree-structured XML
//! - Info.plist (plist.rs) - property list keyed by top-level dict keys
//! - project.pbxproj (pbxproj.rs) - build settings of configuration blocks
//! - xcconfig (xcconfig.rs) - flat `KEY = value` override files
//!
//! ## Driver
//!
//! [`merge_artifact`] loads an artifact, locates and applies every item,
//! and writes the result back only when it differs from what was read. The
//! first write of an artifact is preceded by a snapshot in the backup store.
//!
//! [`merge_platform`] runs every artifact of one platform; [`merge_all`]
//! wraps each platform in its own failure boundary so one platform's error
//! never prevents the others from being attempted.

pub mod pbxproj;
pub mod plist;
pub mod tree_xml;
pub mod xcconfig;

use std::fs;
use std::path::Path;

use crate::backup::BackupGuard;
use crate::context::RunContext;
use crate::error::{Error, Result, Severity};
use crate::model::MergeItem;
use crate::platform::{Artifact, ArtifactKind};
use crate::report::{ArtifactOutcome, ArtifactReport, MergeReport, PlatformReport, SkippedItem};
use crate::resolver;
use crate::restore;

/// Load, locate, apply and serialize for one artifact format.
pub trait FormatAdapter {
    /// Parsed artifact.
    type Doc;
    /// Handle on the place an item applies to.
    type Parent;

    /// Parse `content`, read from `path`.
    fn load(&self, path: &Path, content: &str) -> Result<Self::Doc>;

    /// Find where `item` applies. `Ok(None)` means the selector did not
    /// resolve, and the item is skipped.
    fn locate_parent(&self, doc: &mut Self::Doc, item: &MergeItem) -> Result<Option<Self::Parent>>;

    /// Apply `item` at `parent`. Returns `false` when the item does not
    /// concern this artifact and nothing was done.
    fn apply_item(&self, doc: &mut Self::Doc, parent: Self::Parent, item: &MergeItem)
        -> Result<bool>;

    /// Render the document back to text.
    fn serialize(&self, doc: &Self::Doc) -> Result<String>;
}

/// Where and how an artifact is written.
pub struct ArtifactTarget<'a> {
    pub platform: &'a str,
    pub artifact: Artifact,
    pub path: &'a Path,
    pub backup_name: &'a str,
    pub dry_run: bool,
}

/// Merge `items` into one artifact.
///
/// Skip-level errors are recorded in the report. `ExternalTool` errors
/// abandon the artifact. Anything else is returned to the platform boundary.
pub fn merge_artifact<A: FormatAdapter>(
    adapter: &A,
    backups: &mut BackupGuard,
    target: &ArtifactTarget<'_>,
    items: &[MergeItem],
) -> Result<ArtifactReport> {
    let path_label = target.path.display().to_string();
    if !target.path.is_file() {
        let missing = Error::TargetNotFound {
            artifact: target.artifact.to_string(),
            path: path_label.clone(),
        };
        log::debug!("{}; skipping {} item(s)", missing, items.len());
        return Ok(ArtifactReport::new(
            target.artifact,
            path_label,
            ArtifactOutcome::Missing,
        ));
    }

    let content = fs::read_to_string(target.path)?;
    let mut report = ArtifactReport::new(target.artifact, &path_label, ArtifactOutcome::Unchanged);

    let mut doc = match adapter.load(target.path, &content) {
        Ok(doc) => doc,
        Err(e) if e.severity() == Severity::Abandon => {
            log::error!("{} - Maybe you forgot to remove/add the {} platform?", e, target.platform);
            report.outcome = ArtifactOutcome::Abandoned;
            report.message = Some(e.to_string());
            return Ok(report);
        }
        Err(e) => return Err(e),
    };

    for item in items {
        let result = adapter
            .locate_parent(&mut doc, item)
            .and_then(|parent| match parent {
                Some(parent) => adapter.apply_item(&mut doc, parent, item),
                None => Err(Error::SelectorUnresolved {
                    selector: item.parent.clone(),
                    artifact: target.artifact.to_string(),
                }),
            });
        match result {
            Ok(true) => report.applied += 1,
            Ok(false) => {}
            Err(e) if e.severity() == Severity::Skip => {
                log::debug!("Skipping '{}': {}", item, e);
                report.skipped.push(SkippedItem {
                    item: item.to_string(),
                    reason: e.to_string(),
                });
            }
            Err(e) if e.severity() == Severity::Abandon => {
                log::error!("{}", e);
                report.outcome = ArtifactOutcome::Abandoned;
                report.message = Some(e.to_string());
                return Ok(report);
            }
            Err(e) => return Err(e),
        }
    }

    if report.applied == 0 {
        log::debug!("Nothing applied to {}", path_label);
        return Ok(report);
    }

    let output = adapter.serialize(&doc).map_err(|e| Error::AdapterWrite {
        path: path_label.clone(),
        message: e.to_string(),
    })?;
    if output == content {
        log::debug!("No changes to {}", path_label);
        return Ok(report);
    }

    report.outcome = ArtifactOutcome::Modified;
    if target.dry_run {
        log::info!("Would update {}", path_label);
        return Ok(report);
    }

    backups.ensure_backup(target.path, target.platform, target.backup_name)?;
    fs::write(target.path, output).map_err(|e| Error::AdapterWrite {
        path: path_label.clone(),
        message: e.to_string(),
    })?;
    log::debug!("Wrote {}", path_label);
    Ok(report)
}

fn dispatch(
    backups: &mut BackupGuard,
    target: &ArtifactTarget<'_>,
    items: &[MergeItem],
) -> Result<ArtifactReport> {
    match target.artifact.kind() {
        ArtifactKind::TreeXml => {
            merge_artifact(&tree_xml::TreeXmlAdapter, backups, target, items)
        }
        ArtifactKind::Plist => merge_artifact(&plist::PlistAdapter, backups, target, items),
        ArtifactKind::BuildSettings => {
            merge_artifact(&pbxproj::ProjectFileAdapter, backups, target, items)
        }
        ArtifactKind::OverrideFile => match target.artifact {
            Artifact::XcConfig(file) => {
                merge_artifact(&xcconfig::XcConfigAdapter::new(file), backups, target, items)
            }
            _ => Ok(ArtifactReport::new(
                target.artifact,
                target.path.display().to_string(),
                ArtifactOutcome::Missing,
            )),
        },
    }
}

/// Resolve and merge everything declared for `platform`.
pub fn merge_platform(ctx: &mut RunContext, platform: &str) -> Result<PlatformReport> {
    let entries = ctx.manifest.read_entries(platform);
    let plans = resolver::resolve_platform(platform, &entries);
    let platform_dir = ctx.platform_dir(platform);
    let mut report = PlatformReport::new(platform);

    if plans.is_empty() {
        log::debug!("Nothing to apply for platform {}", platform);
    }

    for plan in plans {
        let path = plan.artifact.live_path(&platform_dir, &ctx.manifest)?;
        let backup_name = plan.artifact.backup_name(&ctx.manifest)?;
        let target = ArtifactTarget {
            platform,
            artifact: plan.artifact,
            path: &path,
            backup_name: &backup_name,
            dry_run: ctx.options.dry_run,
        };
        report
            .artifacts
            .push(dispatch(&mut ctx.backups, &target, &plan.items)?);
    }
    Ok(report)
}

/// Merge every selected platform, each inside its own failure boundary.
///
/// A failed platform is logged and recorded in its report; use
/// [`MergeReport::check`] to turn failures into an error under
/// stop-on-error.
pub fn merge_all(ctx: &mut RunContext) -> Result<MergeReport> {
    let mut report = MergeReport {
        dry_run: ctx.options.dry_run,
        ..MergeReport::default()
    };

    for platform in ctx.platforms()? {
        match merge_platform(ctx, &platform) {
            Ok(platform_report) => report.platforms.push(platform_report),
            Err(e) => {
                log::error!("Error updating config for platform '{}': {}", platform, e);
                let mut failed = PlatformReport::new(&platform);
                failed.error = Some(e.to_string());
                report.platforms.push(failed);
            }
        }
    }

    log::debug!("Finished applying platform config");
    Ok(report)
}

/// Restore pristine artifacts (unless disabled), then merge if this run's
/// stage is the configured one.
pub fn apply(ctx: &mut RunContext) -> Result<MergeReport> {
    if ctx.options.dry_run {
        log::debug!("Dry run: not restoring backups");
    } else {
        restore::restore_all(ctx, &restore::RestoreOptions::default())?;
    }

    if !ctx.hook_matches() {
        let reason = format!(
            "current hook '{}' is not configured hook '{}'",
            ctx.options.hook, ctx.settings.hook
        );
        log::debug!("Not applying custom config because {}", reason);
        return Ok(MergeReport {
            dry_run: ctx.options.dry_run,
            skipped: Some(reason),
            platforms: Vec::new(),
        });
    }

    merge_all(ctx)
}
