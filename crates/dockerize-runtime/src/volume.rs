//! Scratch volume provisioning.

use dockerize_common::error::{DockerizeError, Result};
use dockerize_common::types::VolumeName;

use crate::backend::{ContainerEngine, Labels};

/// Creates a fresh scratch volume with an engine-assigned name.
///
/// A volume is never reused across runs. Nothing already built is cleaned
/// up here when provisioning fails.
///
/// # Errors
///
/// Returns a Resource error if the engine cannot create the volume.
pub fn provision_scratch(engine: &dyn ContainerEngine, labels: &Labels) -> Result<VolumeName> {
    let volume = engine.create_volume(labels)?;
    if volume.as_str().is_empty() {
        return Err(DockerizeError::Resource {
            message: "engine returned an empty volume name".into(),
        });
    }
    tracing::info!(volume = %volume, "scratch volume created");
    Ok(volume)
}
