//! SHA-256 content verification.
//!
//! Confirms that the test binary copied into a build context is the binary
//! the caller pointed at.

use std::io::Read;
use std::path::Path;

use dockerize_common::error::{DockerizeError, Result};
use dockerize_common::types::Sha256Hash;
use sha2::{Digest, Sha256};

const READ_CHUNK: usize = 64 * 1024;

/// Computes the SHA-256 hash of a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn hash_file(path: &Path) -> Result<Sha256Hash> {
    tracing::debug!(path = %path.display(), "computing SHA-256 hash");
    let io_err = |e| DockerizeError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    let mut file = std::fs::File::open(path).map_err(io_err)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = file.read(&mut buf).map_err(io_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let hex: String = hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();
    Sha256Hash::from_hex(hex)
}

/// Validates that a file matches the expected SHA-256 hash.
///
/// # Errors
///
/// Returns `DockerizeError::HashMismatch` if the hashes do not match.
pub fn validate_hash(path: &Path, expected: &Sha256Hash) -> Result<()> {
    let actual = hash_file(path)?;
    if &actual != expected {
        return Err(DockerizeError::HashMismatch {
            resource: path.display().to_string(),
            expected: expected.as_hex().to_string(),
            actual: actual.as_hex().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_of_known_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("hello");
        std::fs::write(&path, b"hello").expect("write");
        let hash = hash_file(&path).expect("hash");
        assert_eq!(
            hash.as_hex(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn validate_detects_mismatch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bin");
        std::fs::write(&path, b"payload").expect("write");
        let wrong = Sha256Hash::from_hex("0".repeat(64)).expect("hash");
        let err = validate_hash(&path, &wrong).expect_err("mismatch");
        assert!(matches!(err, DockerizeError::HashMismatch { .. }));
    }

    #[test]
    fn validate_accepts_matching_hash() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bin");
        std::fs::write(&path, b"payload").expect("write");
        let expected = hash_file(&path).expect("hash");
        validate_hash(&path, &expected).expect("match");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = hash_file(Path::new("/nonexistent/test.bin")).expect_err("missing");
        assert!(matches!(err, DockerizeError::Io { .. }));
    }
}
