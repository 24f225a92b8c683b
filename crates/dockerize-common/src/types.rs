//! Domain primitive types used across the dockerize workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{ENV_REGISTRY_TOKEN, ENV_REGISTRY_URL, ENV_REGISTRY_USER};

/// Unique identifier for one harness invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// Generates a random run ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! engine_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Wraps an engine-assigned identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the inner string representation.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

engine_id!(
    /// Engine-assigned identifier of a built test image.
    ImageId
);

engine_id!(
    /// Engine-assigned name of a scratch volume.
    VolumeName
);

engine_id!(
    /// Engine-assigned identifier of a test container.
    ContainerId
);

/// SHA-256 hash digest used for content verification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sha256Hash(pub(crate) String);

impl Sha256Hash {
    /// Creates a hash from a hex-encoded string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid 64-character hex string.
    pub fn from_hex(hex: impl Into<String>) -> crate::error::Result<Self> {
        let hex = hex.into().to_ascii_lowercase();
        if hex.len() != crate::constants::SHA256_HEX_LENGTH
            || !hex.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(crate::error::DockerizeError::Config {
                message: format!("invalid SHA-256 hex string: {hex}"),
            });
        }
        Ok(Self(hex))
    }

    /// Returns the hex-encoded hash string.
    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Sha256Hash {
    type Error = crate::error::DockerizeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(value)
    }
}

impl From<Sha256Hash> for String {
    fn from(hash: Sha256Hash) -> Self {
        hash.0
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.0)
    }
}

/// Lifecycle state of a test container.
///
/// There is no paused or restarting state: a test container runs once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerState {
    /// Container has been created but not yet started.
    Created,
    /// Container is actively running.
    Running,
    /// Container terminated normally with the given status.
    Exited(i32),
    /// The engine failed to start or execute the container.
    RuntimeError,
}

impl ContainerState {
    /// Returns whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Exited(_) | Self::RuntimeError)
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Exited(code) => write!(f, "exited({code})"),
            Self::RuntimeError => write!(f, "runtime-error"),
        }
    }
}

/// Whether a run removes its resources when it finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupPolicy {
    /// Remove the context directory, container, volume and image.
    #[default]
    Remove,
    /// Leave everything in place for post-mortem inspection.
    Keep,
}

impl CleanupPolicy {
    /// Maps a `--skip-cleanup` style flag to a policy.
    #[must_use]
    pub const fn from_skip_flag(skip_cleanup: bool) -> Self {
        if skip_cleanup { Self::Keep } else { Self::Remove }
    }
}

/// One of the two captured output streams of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl fmt::Display for LogStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// Registry credentials forwarded into the test container.
///
/// Unset values are empty strings, never fabricated.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RegistryCredentials {
    /// Registry username.
    pub user: String,
    /// Registry access token.
    pub token: String,
    /// Registry URL.
    pub url: String,
}

impl RegistryCredentials {
    /// Reads the credentials from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the credentials through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            user: lookup(ENV_REGISTRY_USER).unwrap_or_default(),
            token: lookup(ENV_REGISTRY_TOKEN).unwrap_or_default(),
            url: lookup(ENV_REGISTRY_URL).unwrap_or_default(),
        }
    }

    /// Returns the credentials as `(variable, value)` pairs.
    #[must_use]
    pub fn env_pairs(&self) -> [(&'static str, &str); 3] {
        [
            (ENV_REGISTRY_USER, self.user.as_str()),
            (ENV_REGISTRY_TOKEN, self.token.as_str()),
            (ENV_REGISTRY_URL, self.url.as_str()),
        ]
    }
}

impl fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("user", &self.user)
            .field("token", &if self.token.is_empty() { "" } else { "<redacted>" })
            .field("url", &self.url)
            .finish()
    }
}
