//! Test image construction and base-image pulls.

use std::path::Path;

use dockerize_common::error::{DockerizeError, Result};
use dockerize_common::types::ImageId;

use crate::backend::{ContainerEngine, Labels};
use crate::context::BuildContext;
use crate::manifest;

/// Builds the test image from a synthesized context.
///
/// There is no retry: a failed build is fatal for the run.
///
/// # Errors
///
/// Returns a Build error if the engine rejects the build.
pub fn build_test_image(
    engine: &dyn ContainerEngine,
    context: &BuildContext,
    labels: &Labels,
) -> Result<ImageId> {
    let image = engine.build_image(context.path(), labels)?;
    if image.as_str().is_empty() {
        return Err(DockerizeError::Build {
            message: "engine returned an empty image id".into(),
        });
    }
    tracing::info!(image = %image, "test image built");
    Ok(image)
}

/// Pulls every external base image referenced by a build manifest.
///
/// Returns the pulled references in the order they were pulled.
///
/// # Errors
///
/// Returns an Input error if the manifest cannot be read, and the engine's
/// error for the first image that fails to pull.
pub fn pull_base_images(
    engine: &dyn ContainerEngine,
    manifest_path: &Path,
    signed_pull: bool,
) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(manifest_path).map_err(|e| DockerizeError::Input {
        message: format!("cannot read build manifest {}: {e}", manifest_path.display()),
    })?;
    let parsed = manifest::parse_base_images(&text);

    if !parsed.stages.is_empty() {
        tracing::info!(stages = ?parsed.stages, "ignoring intermediate stage names");
    }
    tracing::info!(
        images = ?parsed.images,
        content_trust = signed_pull,
        "pulling base images"
    );

    let mut pulled = Vec::with_capacity(parsed.images.len());
    for image in parsed.images {
        engine.pull_image(&image, signed_pull)?;
        pulled.push(image);
    }
    Ok(pulled)
}
