//! Container engine abstraction.
//!
//! The harness never talks to an engine directly; it receives a
//! [`ContainerEngine`] handle at construction and calls through it.

pub mod docker;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use dockerize_common::config::HarnessConfig;
use dockerize_common::error::Result;
use dockerize_common::types::{ContainerId, ImageId, LogStream, VolumeName};

use crate::cancel::CancelToken;

/// Labels attached to engine objects, ordered for stable command lines.
pub type Labels = BTreeMap<String, String>;

/// Access mode of a bind-mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountMode {
    /// Mounted read-only.
    ReadOnly,
    /// Mounted read-write.
    ReadWrite,
}

impl fmt::Display for MountMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => write!(f, "ro"),
            Self::ReadWrite => write!(f, "rw"),
        }
    }
}

/// A host path or named volume bound into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    /// Host path or volume name.
    pub source: String,
    /// Path inside the container.
    pub target: String,
    /// Access mode.
    pub mode: MountMode,
}

impl Mount {
    /// Creates a read-only mount.
    #[must_use]
    pub fn read_only(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            mode: MountMode::ReadOnly,
        }
    }

    /// Creates a read-write mount.
    #[must_use]
    pub fn read_write(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            mode: MountMode::ReadWrite,
        }
    }
}

/// How a bounded container wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The container terminated with this status.
    Exited(i32),
    /// The deadline passed first.
    TimedOut,
    /// The cancel token fired first.
    Cancelled,
}

/// Everything needed to launch a test container.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    /// Image to run.
    pub image: ImageId,
    /// Environment variables forwarded into the container.
    pub env: Vec<(String, String)>,
    /// Bind-mounts, in order.
    pub mounts: Vec<Mount>,
    /// Share the host's process namespace.
    pub host_pid: bool,
    /// Share the host's cgroup namespace.
    pub host_cgroupns: bool,
    /// Labels attached to the container.
    pub labels: Labels,
}

impl ContainerSpec {
    /// Returns the value of a container environment variable, if set.
    #[must_use]
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Blocking container engine client.
///
/// Implementors translate each call into one engine operation. Every call
/// blocks the invoking thread until the engine answers.
pub trait ContainerEngine: Send + Sync {
    /// Builds an image from a context directory, removing intermediate
    /// layers, and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns a Build error if the engine rejects the build.
    fn build_image(&self, context: &Path, labels: &Labels) -> Result<ImageId>;

    /// Creates a volume with an engine-assigned unique name.
    ///
    /// # Errors
    ///
    /// Returns a Resource error if the volume cannot be created.
    fn create_volume(&self, labels: &Labels) -> Result<VolumeName>;

    /// Launches a detached container.
    ///
    /// # Errors
    ///
    /// Returns a Runtime error if the container cannot be started.
    fn run_container(&self, spec: &ContainerSpec) -> Result<ContainerId>;

    /// Blocks until the container terminates, the timeout elapses or the
    /// token is cancelled, whichever comes first.
    ///
    /// Must return once the deadline passes even if the engine never
    /// answers. The container itself is left running; stopping it is the
    /// caller's call.
    ///
    /// # Errors
    ///
    /// Returns a Runtime error if the engine cannot report the status.
    fn wait(
        &self,
        id: &ContainerId,
        timeout: Option<Duration>,
        cancel: Option<&CancelToken>,
    ) -> Result<WaitOutcome>;

    /// Fetches the complete contents of one output stream.
    ///
    /// # Errors
    ///
    /// Returns a Runtime error if the logs cannot be retrieved.
    fn logs(&self, id: &ContainerId, stream: LogStream) -> Result<Vec<u8>>;

    /// Force-stops a running container.
    ///
    /// # Errors
    ///
    /// Returns a Runtime error if the container cannot be stopped.
    fn kill(&self, id: &ContainerId) -> Result<()>;

    /// Force-removes a container together with its anonymous volumes.
    ///
    /// # Errors
    ///
    /// Returns a Resource error if removal fails.
    fn remove_container(&self, id: &ContainerId) -> Result<()>;

    /// Force-removes a named volume.
    ///
    /// # Errors
    ///
    /// Returns a Resource error if removal fails.
    fn remove_volume(&self, name: &VolumeName) -> Result<()>;

    /// Removes a built image.
    ///
    /// # Errors
    ///
    /// Returns a Resource error if removal fails.
    fn remove_image(&self, id: &ImageId) -> Result<()>;

    /// Pulls an image, optionally requiring a valid signature.
    ///
    /// # Errors
    ///
    /// Returns a Resource error if the pull fails.
    fn pull_image(&self, reference: &str, content_trust: bool) -> Result<()>;

    /// Returns whether the engine daemon answers.
    fn is_available(&self) -> bool;
}

/// Connects to the engine named in the configuration.
///
/// # Errors
///
/// Returns an Input error if the engine binary cannot be located.
pub fn connect(config: &HarnessConfig) -> Result<Box<dyn ContainerEngine>> {
    Ok(Box::new(docker::DockerCli::locate(&config.engine_binary)?))
}
