//! Formatted output helpers for CLI commands.

use dockerize_common::error::DockerizeError;

/// Maps a command error to the process exit status.
///
/// A failed test exits with the test binary's own status; every other
/// failure exits with 1.
#[must_use]
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<DockerizeError>()
        .map_or(1, DockerizeError::exit_code)
}

/// Returns whether the error only reports a non-zero test status.
#[must_use]
pub fn is_test_failure(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<DockerizeError>(),
        Some(DockerizeError::TestFailure { .. })
    )
}

/// Short verdict for an exit status.
#[must_use]
pub const fn status_label(exit_code: i32) -> &'static str {
    if exit_code == 0 { "PASS" } else { "FAIL" }
}

/// Formats an elapsed time (e.g., "850ms", "12.4s", "3m 05s").
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_duration(elapsed: chrono::TimeDelta) -> String {
    let millis = elapsed.num_milliseconds().max(0);
    if millis < 1_000 {
        format!("{millis}ms")
    } else if millis < 60_000 {
        format!("{:.1}s", millis as f64 / 1_000.0)
    } else {
        let secs = millis / 1_000;
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}
