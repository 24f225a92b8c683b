//! Test container launch with host visibility.
//!
//! The container shares the host's process and cgroup namespaces and sees
//! the engine socket, `/proc` and the cgroup filesystem read-only, so the
//! test binary can detect the context it runs in the same way it would on a
//! real host.

use dockerize_common::constants::{
    CONTAINER_ENGINE_SOCKET, CONTAINER_HOST_CGROUP, CONTAINER_HOST_PROC, ENV_SCRATCH_VOLUME_NAME,
    ENV_SCRATCH_VOLUME_PATH, HOST_CGROUP, HOST_ENGINE_SOCKET, HOST_PROC, SCRATCH_MOUNT_PATH,
};
use dockerize_common::error::Result;
use dockerize_common::types::{ContainerState, ImageId, RegistryCredentials, VolumeName};

use crate::backend::{ContainerEngine, ContainerSpec, Labels, Mount};
use crate::container::TestContainer;

/// Builds the fixed container spec for a test run.
#[must_use]
pub fn test_container_spec(
    image: &ImageId,
    volume: &VolumeName,
    credentials: &RegistryCredentials,
    labels: &Labels,
) -> ContainerSpec {
    let mut env = vec![
        (ENV_SCRATCH_VOLUME_NAME.to_string(), volume.to_string()),
        (ENV_SCRATCH_VOLUME_PATH.to_string(), SCRATCH_MOUNT_PATH.to_string()),
    ];
    env.extend(
        credentials
            .env_pairs()
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.to_string())),
    );

    ContainerSpec {
        image: image.clone(),
        env,
        mounts: vec![
            Mount::read_only(HOST_ENGINE_SOCKET, CONTAINER_ENGINE_SOCKET),
            Mount::read_only(HOST_PROC, CONTAINER_HOST_PROC),
            Mount::read_only(HOST_CGROUP, CONTAINER_HOST_CGROUP),
            Mount::read_write(volume.as_str(), SCRATCH_MOUNT_PATH),
        ],
        host_pid: true,
        host_cgroupns: true,
        labels: labels.clone(),
    }
}

/// Launches the test container detached and returns it in `Running` state.
///
/// # Errors
///
/// Returns a Runtime error if the engine cannot start the container.
pub fn launch(engine: &dyn ContainerEngine, spec: &ContainerSpec) -> Result<TestContainer> {
    let id = engine.run_container(spec)?;
    let mut container = TestContainer::new(id);
    container.transition(ContainerState::Running)?;
    tracing::info!(id = %container.id, image = %spec.image, "test container started");
    Ok(container)
}
