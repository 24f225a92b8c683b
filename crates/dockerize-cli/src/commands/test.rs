//! `dockerize test`: run a test binary in a host-visible container.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use dockerize_common::types::{CleanupPolicy, RegistryCredentials};
use dockerize_runtime::backend;
use dockerize_runtime::cancel::CancelToken;
use dockerize_runtime::harness::{Harness, TestReport, TestRun};

use crate::output;

/// Arguments for the `test` command.
#[derive(Args, Debug)]
pub struct TestArgs {
    /// Path to the compiled test binary.
    pub binary: PathBuf,

    /// Test-data directory copied to /testdata (defaults to ./testdata).
    #[arg(long, value_name = "DIR")]
    pub test_data: Option<PathBuf>,

    /// Leave the context, image, volume and container in place.
    #[arg(long)]
    pub skip_cleanup: bool,

    /// Stop the container after this many seconds.
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Write a JSON run report to stderr after the container's output.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `test` command.
///
/// # Errors
///
/// Returns an error if any stage of the run fails, and a `TestFailure`
/// carrying the binary's status when it exits non-zero.
pub fn execute(args: &TestArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let engine = backend::connect(&config)?;
    if !engine.is_available() {
        tracing::warn!(engine = %config.engine_binary, "container engine is not answering");
    }

    let token = CancelToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("failed to install Ctrl+C handler")?;

    let run = build_run(args, RegistryCredentials::from_env()).cancel_token(token);
    let harness = Harness::new(engine.as_ref(), config);
    let report = harness.run(&run)?;

    if args.json {
        write_report(&report)?;
    }
    eprintln!(
        "{} {} (exit code {}) in {}",
        output::status_label(report.exit_code),
        args.binary.display(),
        report.exit_code,
        output::format_duration(report.finished_at - report.started_at),
    );
    if report.retained {
        eprintln!(
            "kept image {} volume {} container {}",
            report.image, report.volume, report.container
        );
    }

    let _ = report.into_result()?;
    Ok(())
}

fn build_run(args: &TestArgs, credentials: RegistryCredentials) -> TestRun {
    let mut run = TestRun::new(&args.binary).credentials(credentials);
    if let Some(dir) = &args.test_data {
        run = run.test_data(dir);
    }
    if args.skip_cleanup {
        run = run.cleanup(CleanupPolicy::from_skip_flag(true));
    }
    if let Some(secs) = args.timeout {
        run = run.timeout(Duration::from_secs(secs));
    }
    run
}

fn write_report(report: &TestReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report).context("failed to serialize run report")?;
    let mut stderr = std::io::stderr().lock();
    writeln!(stderr, "{json}").context("failed to write run report")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> TestArgs {
        TestArgs {
            binary: PathBuf::from("/tmp/agent.test"),
            test_data: None,
            skip_cleanup: false,
            timeout: None,
            json: false,
        }
    }

    #[test]
    fn defaults_leave_run_unbounded() {
        let run = build_run(&args(), RegistryCredentials::default());
        assert_eq!(run.binary().to_str(), Some("/tmp/agent.test"));
    }

    #[test]
    fn flags_shape_the_run() {
        let mut a = args();
        a.skip_cleanup = true;
        a.timeout = Some(5);
        a.test_data = Some(PathBuf::from("fixtures"));
        let run = build_run(&a, RegistryCredentials::default());
        let debug = format!("{run:?}");
        assert!(debug.contains("Keep"));
        assert!(debug.contains("5s"));
        assert!(debug.contains("fixtures"));
    }
}
