//! Outcome collection: wait for termination, then capture both streams.
//!
//! Streams are fetched whole after termination, one engine call each, and
//! never interleaved. Nothing here interprets what the test binary printed.

use std::io::{self, Write};
use std::time::Duration;

use dockerize_common::error::{DockerizeError, Result};
use dockerize_common::types::{ContainerId, ContainerState, LogStream};
use serde::Serialize;

use crate::backend::{ContainerEngine, WaitOutcome};
use crate::cancel::CancelToken;
use crate::container::TestContainer;

/// Decoded output of a terminated container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapturedOutput {
    /// Complete standard output.
    pub stdout: String,
    /// Complete standard error.
    pub stderr: String,
}

/// Blocks until the container terminates and returns its exit status.
///
/// The deadline and the [`CancelToken`] are handed to the engine wait
/// itself, which gives up on its own. If either ends the wait, the
/// container is force-stopped before returning.
///
/// # Errors
///
/// Returns a Runtime error if the engine fails while waiting, `Timeout` when
/// the deadline passes, and `Cancelled` when the token fires.
pub fn await_exit(
    engine: &dyn ContainerEngine,
    container: &mut TestContainer,
    timeout: Option<Duration>,
    cancel: Option<&CancelToken>,
) -> Result<i32> {
    let outcome = match engine.wait(&container.id, timeout, cancel) {
        Ok(outcome) => outcome,
        Err(e) => {
            container.transition(ContainerState::RuntimeError)?;
            return Err(e);
        }
    };

    match outcome {
        WaitOutcome::Exited(code) => {
            container.transition(ContainerState::Exited(code))?;
            tracing::info!(id = %container.id, code, "test container exited");
            Ok(code)
        }
        WaitOutcome::TimedOut => {
            force_stop(engine, &container.id);
            container.transition(ContainerState::RuntimeError)?;
            Err(DockerizeError::Timeout {
                container: container.id.to_string(),
                limit: timeout.unwrap_or_default(),
            })
        }
        WaitOutcome::Cancelled => {
            force_stop(engine, &container.id);
            container.transition(ContainerState::RuntimeError)?;
            Err(DockerizeError::Cancelled {
                container: container.id.to_string(),
            })
        }
    }
}

fn force_stop(engine: &dyn ContainerEngine, id: &ContainerId) {
    tracing::warn!(id = %id, "stopping test container");
    if let Err(e) = engine.kill(id) {
        tracing::warn!(id = %id, error = %e, "failed to stop test container");
    }
}

/// Captures and echoes whatever a stopped container managed to print.
///
/// Used after a timeout or cancellation so partial output is shown before
/// the failure is reported. Failures are logged, never returned.
pub fn salvage(
    engine: &dyn ContainerEngine,
    id: &ContainerId,
    out: &mut dyn Write,
    err: &mut dyn Write,
) {
    match capture(engine, id) {
        Ok(output) => {
            if let Err(e) = echo(&output, out, err) {
                tracing::warn!(id = %id, error = %e, "failed to echo partial output");
            }
        }
        Err(e) => tracing::warn!(id = %id, error = %e, "failed to capture partial output"),
    }
}

/// Fetches stdout and stderr as two independent, complete reads.
///
/// Bytes are decoded as UTF-8; invalid sequences are replaced rather than
/// rejected.
///
/// # Errors
///
/// Returns a Runtime error if either stream cannot be retrieved.
pub fn capture(engine: &dyn ContainerEngine, id: &ContainerId) -> Result<CapturedOutput> {
    let stdout = engine.logs(id, LogStream::Stdout)?;
    let stderr = engine.logs(id, LogStream::Stderr)?;
    tracing::debug!(
        id = %id,
        stdout_bytes = stdout.len(),
        stderr_bytes = stderr.len(),
        "container output captured"
    );
    Ok(CapturedOutput {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}

/// Reprints captured output, stdout to `out` and stderr to `err`.
///
/// # Errors
///
/// Returns an error if either writer fails.
pub fn echo(output: &CapturedOutput, out: &mut dyn Write, err: &mut dyn Write) -> io::Result<()> {
    out.write_all(output.stdout.as_bytes())?;
    out.flush()?;
    err.write_all(output.stderr.as_bytes())?;
    err.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_keeps_streams_separate() {
        let output = CapturedOutput {
            stdout: "PASS\n".into(),
            stderr: "warning: slow\n".into(),
        };
        let mut out = Vec::new();
        let mut err = Vec::new();
        echo(&output, &mut out, &mut err).expect("echo");
        assert_eq!(out, b"PASS\n");
        assert_eq!(err, b"warning: slow\n");
    }

    #[test]
    fn echo_of_empty_output_writes_nothing() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        echo(&CapturedOutput::default(), &mut out, &mut err).expect("echo");
        assert!(out.is_empty());
        assert!(err.is_empty());
    }
}
