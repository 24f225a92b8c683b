//! Resource release after a run.
//!
//! Cleanup never fails a run: every removal is attempted independently and
//! failures are reported as warnings. Under [`CleanupPolicy::Keep`] nothing
//! is touched and the retained identifiers are logged instead.

use std::path::PathBuf;

use dockerize_common::types::{CleanupPolicy, ContainerId, ImageId, VolumeName};

use crate::backend::ContainerEngine;

/// Resources acquired so far by a run.
///
/// Fields are filled in as stages succeed, so a run that fails midway only
/// releases what it actually created.
#[derive(Debug, Clone, Default)]
pub struct RunResources {
    /// Synthesized build context directory.
    pub context: Option<PathBuf>,
    /// Built test image.
    pub image: Option<ImageId>,
    /// Scratch volume.
    pub volume: Option<VolumeName>,
    /// Test container.
    pub container: Option<ContainerId>,
}

impl RunResources {
    /// Returns whether no resource has been acquired.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.context.is_none()
            && self.image.is_none()
            && self.volume.is_none()
            && self.container.is_none()
    }
}

/// What a cleanup pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupSummary {
    /// Resources removed.
    pub removed: usize,
    /// Removals that failed and were left behind.
    pub failed: usize,
    /// Resources deliberately retained.
    pub retained: usize,
}

/// Releases a run's resources according to `policy`.
///
/// Removal order is context directory, container, volume, image, so nothing
/// is removed while something else still references it.
pub fn release(
    engine: &dyn ContainerEngine,
    resources: &RunResources,
    policy: CleanupPolicy,
) -> CleanupSummary {
    let mut summary = CleanupSummary::default();
    if resources.is_empty() {
        tracing::debug!("nothing to release");
        return summary;
    }

    if policy == CleanupPolicy::Keep {
        if let Some(dir) = &resources.context {
            tracing::info!(dir = %dir.display(), "keeping build context");
            summary.retained += 1;
        }
        if let Some(id) = &resources.container {
            tracing::info!(container = %id, "keeping test container");
            summary.retained += 1;
        }
        if let Some(name) = &resources.volume {
            tracing::info!(volume = %name, "keeping scratch volume");
            summary.retained += 1;
        }
        if let Some(image) = &resources.image {
            tracing::info!(image = %image, "keeping test image");
            summary.retained += 1;
        }
        return summary;
    }

    if let Some(dir) = &resources.context {
        record(
            &mut summary,
            "build context",
            &dir.display().to_string(),
            std::fs::remove_dir_all(dir).map_err(|e| e.to_string()),
        );
    }
    if let Some(id) = &resources.container {
        record(
            &mut summary,
            "test container",
            id.as_str(),
            engine.remove_container(id).map_err(|e| e.to_string()),
        );
    }
    if let Some(name) = &resources.volume {
        record(
            &mut summary,
            "scratch volume",
            name.as_str(),
            engine.remove_volume(name).map_err(|e| e.to_string()),
        );
    }
    if let Some(image) = &resources.image {
        record(
            &mut summary,
            "test image",
            image.as_str(),
            engine.remove_image(image).map_err(|e| e.to_string()),
        );
    }

    tracing::debug!(
        removed = summary.removed,
        failed = summary.failed,
        "cleanup finished"
    );
    summary
}

fn record(
    summary: &mut CleanupSummary,
    kind: &str,
    name: &str,
    outcome: std::result::Result<(), String>,
) {
    match outcome {
        Ok(()) => {
            tracing::debug!(kind, name, "removed");
            summary.removed += 1;
        }
        Err(error) => {
            tracing::warn!(kind, name, %error, "cleanup failed, resource left behind");
            summary.failed += 1;
        }
    }
}
