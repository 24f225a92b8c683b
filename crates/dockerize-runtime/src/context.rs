//! Build-context synthesis.
//!
//! A context is a fresh temporary directory holding the generated manifest,
//! the generated entrypoint, a verified copy of the test binary, and the
//! optional test data. Nothing outside that directory is written.

use std::path::{Path, PathBuf};

use dockerize_common::config::ManifestConfig;
use dockerize_common::constants::{
    CONTEXT_DIR_PREFIX, ENTRYPOINT_FILE, MANIFEST_FILE, TEST_BINARY_FILE, TEST_DATA_CONTEXT_DIR,
};
use dockerize_common::error::{DockerizeError, Result};
use dockerize_common::types::Sha256Hash;

use crate::{hash, manifest};

/// A synthesized, self-contained build context directory.
///
/// The directory outlives this value; removing it is the cleanup stage's job.
#[derive(Debug, Clone)]
pub struct BuildContext {
    dir: PathBuf,
    binary_digest: Sha256Hash,
    has_test_data: bool,
}

impl BuildContext {
    /// Assembles a build context for `binary`.
    ///
    /// `test_data` is copied when it names an existing directory and is
    /// silently skipped otherwise.
    ///
    /// # Errors
    ///
    /// Returns an Input error if the binary does not exist and a Resource
    /// error if any file in the context cannot be written. A partially
    /// written directory is removed before returning.
    pub fn synthesize(
        binary: &Path,
        test_data: Option<&Path>,
        config: &ManifestConfig,
        work_dir: Option<&Path>,
    ) -> Result<Self> {
        ensure_binary(binary)?;

        let parent = work_dir.map_or_else(std::env::temp_dir, Path::to_path_buf);
        let temp = tempfile::Builder::new()
            .prefix(CONTEXT_DIR_PREFIX)
            .tempdir_in(&parent)
            .map_err(|e| DockerizeError::Io {
                path: parent.clone(),
                source: e,
            })?;
        let dir = temp.path().to_path_buf();
        tracing::info!(dir = %dir.display(), binary = %binary.display(), "synthesizing build context");

        let binary_digest = copy_binary(binary, &dir.join(TEST_BINARY_FILE))?;

        let entrypoint = dir.join(ENTRYPOINT_FILE);
        write_file(&entrypoint, &manifest::render_entrypoint())?;
        make_executable(&entrypoint)?;

        let test_data = test_data.filter(|p| p.is_dir());
        if let Some(source) = test_data {
            copy_dir_recursive(source, &dir.join(TEST_DATA_CONTEXT_DIR))?;
            tracing::info!(source = %source.display(), "test data added to context");
        }

        write_file(
            &dir.join(MANIFEST_FILE),
            &manifest::render_manifest(config, test_data.is_some()),
        )?;

        // Fully written; from here on the directory is owned by the run.
        let _ = temp.keep();
        Ok(Self {
            dir,
            binary_digest,
            has_test_data: test_data.is_some(),
        })
    }

    /// Returns the context directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Returns the SHA-256 digest of the copied test binary.
    #[must_use]
    pub const fn binary_digest(&self) -> &Sha256Hash {
        &self.binary_digest
    }

    /// Returns whether test data was copied into the context.
    #[must_use]
    pub const fn has_test_data(&self) -> bool {
        self.has_test_data
    }
}

/// Checks that the test binary exists and is a regular file.
///
/// # Errors
///
/// Returns an Input error otherwise.
pub fn ensure_binary(binary: &Path) -> Result<()> {
    if binary.is_file() {
        Ok(())
    } else {
        Err(DockerizeError::Input {
            message: format!("test binary not found: {}", binary.display()),
        })
    }
}

fn copy_binary(source: &Path, target: &Path) -> Result<Sha256Hash> {
    let expected = hash::hash_file(source)?;
    let _ = std::fs::copy(source, target).map_err(|e| DockerizeError::Io {
        path: target.to_path_buf(),
        source: e,
    })?;
    make_executable(target)?;
    hash::validate_hash(target, &expected)?;
    Ok(expected)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).map_err(|e| DockerizeError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(|e| {
        DockerizeError::Io {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
const fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

fn copy_dir_recursive(source: &Path, target: &Path) -> Result<()> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |e: std::io::Error| DockerizeError::Io { path, source: e }
    };
    std::fs::create_dir_all(target).map_err(io_err(target))?;
    for entry in std::fs::read_dir(source).map_err(io_err(source))? {
        let entry = entry.map_err(io_err(source))?;
        let from = entry.path();
        let to = target.join(entry.file_name());
        let file_type = entry.file_type().map_err(io_err(&from))?;
        if file_type.is_symlink() {
            copy_symlink(&from, &to)?;
        } else if file_type.is_dir() {
            copy_dir_recursive(&from, &to)?;
        } else {
            let _ = std::fs::copy(&from, &to).map_err(io_err(&to))?;
        }
    }
    Ok(())
}

/// Recreates a link as a link, so links to directories survive the copy.
#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    let link = std::fs::read_link(from).map_err(|e| DockerizeError::Io {
        path: from.to_path_buf(),
        source: e,
    })?;
    std::os::unix::fs::symlink(&link, to).map_err(|e| DockerizeError::Io {
        path: to.to_path_buf(),
        source: e,
    })
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    if from.is_dir() {
        copy_dir_recursive(from, to)
    } else {
        let _ = std::fs::copy(from, to).map_err(|e| DockerizeError::Io {
            path: to.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }
}
