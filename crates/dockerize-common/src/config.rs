//! Configuration model for the test harness.
//!
//! Every field has a default, so an empty YAML document is a valid
//! configuration. The pinned compose tool lives here rather than in code so
//! a version bump is a configuration change.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BASE_IMAGE, DEFAULT_COMPOSE_ARCH, DEFAULT_COMPOSE_SHA256, DEFAULT_COMPOSE_VERSION,
    DEFAULT_ENGINE_BINARY, DEFAULT_ENGINE_CLI_IMAGE, DEFAULT_TEST_DATA_DIR,
};
use crate::error::{DockerizeError, Result};
use crate::types::{CleanupPolicy, Sha256Hash};

/// Root configuration for the test harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Container engine CLI binary (name on `PATH` or absolute path).
    pub engine_binary: String,
    /// Parent directory for build contexts; the system temp dir when unset.
    pub work_dir: Option<PathBuf>,
    /// Location of the optional test-data directory.
    pub test_data_dir: PathBuf,
    /// Default cleanup policy for runs.
    pub cleanup: CleanupPolicy,
    /// Build manifest pins.
    pub manifest: ManifestConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            engine_binary: DEFAULT_ENGINE_BINARY.into(),
            work_dir: None,
            test_data_dir: PathBuf::from(DEFAULT_TEST_DATA_DIR),
            cleanup: CleanupPolicy::default(),
            manifest: ManifestConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Parses a configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or a pin is invalid.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DockerizeError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Checks values that serde cannot reject on its own.
    ///
    /// # Errors
    ///
    /// Returns `DockerizeError::Config` describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.engine_binary.trim().is_empty() {
            return Err(DockerizeError::Config {
                message: "engine_binary must not be empty".into(),
            });
        }
        self.manifest.validate()
    }
}

/// Pins used to render the build manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManifestConfig {
    /// Minimal base OS image.
    pub base_image: String,
    /// Image the engine CLI binary is copied out of.
    pub engine_cli_image: String,
    /// Compose tool release version.
    pub compose_version: String,
    /// Architecture suffix of the compose release asset.
    pub compose_arch: String,
    /// Expected SHA-256 of the compose release binary.
    pub compose_sha256: Sha256Hash,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            base_image: DEFAULT_BASE_IMAGE.into(),
            engine_cli_image: DEFAULT_ENGINE_CLI_IMAGE.into(),
            compose_version: DEFAULT_COMPOSE_VERSION.into(),
            compose_arch: DEFAULT_COMPOSE_ARCH.into(),
            compose_sha256: Sha256Hash(DEFAULT_COMPOSE_SHA256.into()),
        }
    }
}

impl ManifestConfig {
    /// Rejects values that would produce a broken manifest.
    ///
    /// # Errors
    ///
    /// Returns `DockerizeError::Config` for empty or whitespace-bearing
    /// image references and malformed versions.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("base_image", &self.base_image),
            ("engine_cli_image", &self.engine_cli_image),
        ] {
            if value.is_empty() || value.chars().any(char::is_whitespace) {
                return Err(DockerizeError::Config {
                    message: format!("{field} must be a single image reference, got {value:?}"),
                });
            }
        }
        for (field, value) in [
            ("compose_version", &self.compose_version),
            ("compose_arch", &self.compose_arch),
        ] {
            let ok = !value.is_empty()
                && value
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
            if !ok {
                return Err(DockerizeError::Config {
                    message: format!("invalid {field} {value:?}"),
                });
            }
        }
        Ok(())
    }
}
