//! Fixed paths, environment variable names, and pinned tool versions.

/// Default container engine CLI binary.
pub const DEFAULT_ENGINE_BINARY: &str = "docker";

/// Prefix of every synthesized build context directory.
pub const CONTEXT_DIR_PREFIX: &str = "ddtest-";

/// Conventional relative location of the optional test-data directory.
pub const DEFAULT_TEST_DATA_DIR: &str = "./testdata";

/// Label attached to every image, volume and container created by a run.
pub const RUN_LABEL: &str = "dockerize.run";

// ── Build context file names ─────────────────────────────────────────

/// File name of the generated build manifest inside the context.
pub const MANIFEST_FILE: &str = "Dockerfile";

/// File name of the generated entrypoint script inside the context.
pub const ENTRYPOINT_FILE: &str = "entrypoint.sh";

/// File name of the copied test binary inside the context.
pub const TEST_BINARY_FILE: &str = "test.bin";

/// Directory name of the copied test data inside the context.
pub const TEST_DATA_CONTEXT_DIR: &str = "testdata";

// ── In-container paths ───────────────────────────────────────────────

/// Path of the test binary inside the container.
pub const CONTAINER_BINARY_PATH: &str = "/test.bin";

/// Path of the entrypoint script inside the container.
pub const CONTAINER_ENTRYPOINT_PATH: &str = "/entrypoint.sh";

/// Path of the test data inside the container.
pub const CONTAINER_TEST_DATA_PATH: &str = "/testdata";

/// Path where the scratch volume is mounted read-write.
pub const SCRATCH_MOUNT_PATH: &str = "/tmp/scratch";

/// Host container-engine control socket.
pub const HOST_ENGINE_SOCKET: &str = "/var/run/docker.sock";

/// In-container path of the engine control socket.
pub const CONTAINER_ENGINE_SOCKET: &str = "/var/run/docker.sock";

/// Host process-information pseudo-filesystem.
pub const HOST_PROC: &str = "/proc";

/// In-container path of the host process-information filesystem.
pub const CONTAINER_HOST_PROC: &str = "/host/proc";

/// Host cgroup filesystem.
pub const HOST_CGROUP: &str = "/sys/fs/cgroup";

/// In-container path of the host cgroup filesystem.
pub const CONTAINER_HOST_CGROUP: &str = "/host/sys/fs/cgroup";

// ── Environment variables ────────────────────────────────────────────

/// Registry username.
pub const ENV_REGISTRY_USER: &str = "DOCKER_USER";

/// Registry token, piped to the login command.
pub const ENV_REGISTRY_TOKEN: &str = "DOCKER_TOKEN";

/// Registry URL.
pub const ENV_REGISTRY_URL: &str = "DOCKER_REGISTRY_URL";

/// Name of the scratch volume, forwarded into the container.
pub const ENV_SCRATCH_VOLUME_NAME: &str = "SCRATCH_VOLUME_NAME";

/// Mount path of the scratch volume, forwarded into the container.
pub const ENV_SCRATCH_VOLUME_PATH: &str = "SCRATCH_VOLUME_PATH";

/// Marker set in the image so the test binary knows where it runs.
pub const ENV_AGENT_MARKER: &str = "DOCKER_DD_AGENT";

/// Enables signature verification on `pull`.
pub const ENV_CONTENT_TRUST: &str = "DOCKER_CONTENT_TRUST";

// ── Pinned tools ─────────────────────────────────────────────────────

/// Minimal base OS image of the test image.
pub const DEFAULT_BASE_IMAGE: &str = "public.ecr.aws/docker/library/ubuntu:20.04";

/// Image the engine CLI binary is copied from.
pub const DEFAULT_ENGINE_CLI_IMAGE: &str = "public.ecr.aws/docker/library/docker:26.1-cli";

/// Pinned compose tool version.
pub const DEFAULT_COMPOSE_VERSION: &str = "2.26.1";

/// Architecture suffix of the pinned compose release asset.
///
/// The hash pin below belongs to this asset; other architectures need their
/// own pin.
pub const DEFAULT_COMPOSE_ARCH: &str = "x86_64";

/// SHA-256 of the pinned compose tool release binary.
pub const DEFAULT_COMPOSE_SHA256: &str =
    "2f61856d1b8c9de29ffdaedaa1c6d0a5fc5c79da45068f1f4310feed8d3a3f61";

/// SHA-256 digest length in hex characters.
pub const SHA256_HEX_LENGTH: usize = 64;

// ── Registry ─────────────────────────────────────────────────────────

/// Default Docker Hub API endpoint used for tag deletion.
pub const DEFAULT_HUB_API: &str = "https://hub.docker.com";
