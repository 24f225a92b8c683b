//! Unified error types for the dockerize workspace.
//!
//! Every variant belongs to exactly one [`ErrorCategory`]. Callers branch on
//! the category; the variant carries the detail.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum DockerizeError {
    /// A caller-supplied input is missing or malformed.
    #[error("invalid input: {message}")]
    Input {
        /// Description of the invalid input.
        message: String,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// An engine-side resource (volume, context) could not be provisioned.
    #[error("resource error: {message}")]
    Resource {
        /// Description of the provisioning failure.
        message: String,
    },

    /// A hash validation failed.
    #[error("hash mismatch for {resource}: expected {expected}, got {actual}")]
    HashMismatch {
        /// Resource that failed validation.
        resource: String,
        /// Expected hash value.
        expected: String,
        /// Actual computed hash value.
        actual: String,
    },

    /// The image build failed.
    #[error("image build failed: {message}")]
    Build {
        /// Engine output describing the failure.
        message: String,
    },

    /// The container failed to start or the engine failed around it.
    #[error("container runtime error: {message}")]
    Runtime {
        /// Description of the runtime failure.
        message: String,
    },

    /// The container did not terminate before the deadline.
    #[error("container {container} exceeded timeout of {limit:?} and was stopped")]
    Timeout {
        /// Container that was stopped.
        container: String,
        /// Configured timeout.
        limit: Duration,
    },

    /// The run was cancelled while the container was executing.
    #[error("run cancelled while container {container} was executing")]
    Cancelled {
        /// Container that was stopped.
        container: String,
    },

    /// The test binary ran to completion with a non-zero exit status.
    #[error("test binary exited with status {code}")]
    TestFailure {
        /// Exact exit status of the test container.
        code: i32,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_yaml::Error,
    },
}

/// Coarse classification of a [`DockerizeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing binary, malformed manifest argument or configuration.
    Input,
    /// Filesystem or volume provisioning failure.
    Resource,
    /// Image build failure, including pinned-tool hash mismatch.
    Build,
    /// Container failed to start or the engine failed while it ran.
    Runtime,
    /// The run exceeded its deadline.
    Timeout,
    /// The run was cancelled by the caller.
    Cancelled,
    /// The container completed with a non-zero status.
    TestFailure,
}

impl DockerizeError {
    /// Returns the category this error belongs to.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Input { .. } | Self::Config { .. } | Self::Serialization { .. } => {
                ErrorCategory::Input
            }
            Self::Io { .. } | Self::Resource { .. } | Self::HashMismatch { .. } => {
                ErrorCategory::Resource
            }
            Self::Build { .. } => ErrorCategory::Build,
            Self::Runtime { .. } => ErrorCategory::Runtime,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Cancelled { .. } => ErrorCategory::Cancelled,
            Self::TestFailure { .. } => ErrorCategory::TestFailure,
        }
    }

    /// Returns the process exit status this error should map to.
    ///
    /// A test failure carries the container's status verbatim; every other
    /// failure maps to `1`.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::TestFailure { code } => *code,
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Resource => write!(f, "resource"),
            Self::Build => write!(f, "build"),
            Self::Runtime => write!(f, "runtime"),
            Self::Timeout => write!(f, "timeout"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::TestFailure => write!(f, "test failure"),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, DockerizeError>;
