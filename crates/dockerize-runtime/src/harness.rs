//! Run orchestration.
//!
//! [`Harness`] drives one [`TestRun`] through the stages in order and always
//! hands whatever was acquired to the cleanup stage, whether the run
//! finished or was aborted.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dockerize_common::config::HarnessConfig;
use dockerize_common::constants::RUN_LABEL;
use dockerize_common::error::{DockerizeError, ErrorCategory, Result};
use dockerize_common::types::{
    CleanupPolicy, ContainerId, ImageId, RegistryCredentials, RunId, Sha256Hash, VolumeName,
};
use serde::Serialize;

use crate::backend::{ContainerEngine, Labels};
use crate::cancel::CancelToken;
use crate::cleanup::{self, RunResources};
use crate::collector::{self, CapturedOutput};
use crate::context::{self, BuildContext};
use crate::{image, runner, volume};

/// One requested execution of a test binary.
#[derive(Debug, Clone)]
pub struct TestRun {
    binary: PathBuf,
    test_data: Option<PathBuf>,
    credentials: RegistryCredentials,
    cleanup: Option<CleanupPolicy>,
    timeout: Option<Duration>,
    cancel: Option<CancelToken>,
}

impl TestRun {
    /// Creates a run for `binary` with empty credentials, the configured
    /// test-data location and cleanup policy, and no timeout.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            test_data: None,
            credentials: RegistryCredentials::default(),
            cleanup: None,
            timeout: None,
            cancel: None,
        }
    }

    /// Overrides the test-data directory.
    #[must_use]
    pub fn test_data(mut self, dir: impl Into<PathBuf>) -> Self {
        self.test_data = Some(dir.into());
        self
    }

    /// Sets the registry credentials forwarded into the container.
    #[must_use]
    pub fn credentials(mut self, credentials: RegistryCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Overrides the cleanup policy.
    #[must_use]
    pub const fn cleanup(mut self, policy: CleanupPolicy) -> Self {
        self.cleanup = Some(policy);
        self
    }

    /// Bounds how long the container may run.
    #[must_use]
    pub const fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Attaches a token that can abort the container wait.
    #[must_use]
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Returns the test binary path.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

/// Result of a run whose container terminated normally.
#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    /// Identifier of the run, also used as the resource label value.
    pub run_id: RunId,
    /// Built test image.
    pub image: ImageId,
    /// Scratch volume.
    pub volume: VolumeName,
    /// Test container.
    pub container: ContainerId,
    /// Digest of the test binary baked into the image.
    pub binary_digest: Sha256Hash,
    /// Whether a test-data directory was copied into the image.
    pub test_data: bool,
    /// Exit status of the test binary.
    pub exit_code: i32,
    /// Captured output.
    #[serde(flatten)]
    pub output: CapturedOutput,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When cleanup finished.
    pub finished_at: DateTime<Utc>,
    /// Whether resources were left in place.
    pub retained: bool,
}

impl TestReport {
    /// Returns whether the test binary exited with status zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Converts a non-zero exit status into a `TestFailure`.
    ///
    /// # Errors
    ///
    /// Returns `TestFailure` carrying the exact exit status when it is not
    /// zero.
    pub fn into_result(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(DockerizeError::TestFailure {
                code: self.exit_code,
            })
        }
    }
}

struct Executed {
    image: ImageId,
    volume: VolumeName,
    container: ContainerId,
    binary_digest: Sha256Hash,
    test_data: bool,
    exit_code: i32,
    output: CapturedOutput,
}

/// Drives test runs against one container engine.
pub struct Harness<'e> {
    engine: &'e dyn ContainerEngine,
    config: HarnessConfig,
}

impl<'e> Harness<'e> {
    /// Creates a harness bound to `engine`.
    #[must_use]
    pub fn new(engine: &'e dyn ContainerEngine, config: HarnessConfig) -> Self {
        Self { engine, config }
    }

    /// Returns the harness configuration.
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Executes a run, echoing the container's streams to this process's
    /// stdout and stderr.
    ///
    /// # Errors
    ///
    /// See [`Harness::run_with_output`].
    pub fn run(&self, run: &TestRun) -> Result<TestReport> {
        let stdout = io::stdout();
        let stderr = io::stderr();
        self.run_with_output(run, &mut stdout.lock(), &mut stderr.lock())
    }

    /// Executes a run, echoing the container's streams to `out` and `err`.
    ///
    /// A non-zero exit status is not an error here; the report carries it
    /// and [`TestReport::into_result`] turns it into `TestFailure`. Both
    /// streams are echoed before this returns, including whatever a timed
    /// out or cancelled container printed before it was stopped.
    ///
    /// # Errors
    ///
    /// Returns Input, Resource, Build or Runtime errors from the stage that
    /// failed, and `Timeout` or `Cancelled` when the wait was cut short.
    /// Resources acquired before the failure are still released according
    /// to the run's cleanup policy.
    pub fn run_with_output(
        &self,
        run: &TestRun,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<TestReport> {
        let run_id = RunId::generate();
        let started_at = Utc::now();
        let policy = run.cleanup.unwrap_or(self.config.cleanup);
        let span = tracing::info_span!("test_run", run_id = %run_id);
        let _guard = span.enter();
        tracing::info!(binary = %run.binary.display(), cleanup = ?policy, "starting test run");

        // Nothing is created for a binary that does not exist.
        context::ensure_binary(&run.binary)?;

        let mut resources = RunResources::default();
        let outcome = self.execute(run, &run_id, &mut resources, out, err);
        let summary = cleanup::release(self.engine, &resources, policy);
        let executed = outcome?;

        tracing::info!(
            exit_code = executed.exit_code,
            removed = summary.removed,
            retained = summary.retained,
            "test run finished"
        );
        Ok(TestReport {
            run_id,
            image: executed.image,
            volume: executed.volume,
            container: executed.container,
            binary_digest: executed.binary_digest,
            test_data: executed.test_data,
            exit_code: executed.exit_code,
            output: executed.output,
            started_at,
            finished_at: Utc::now(),
            retained: policy == CleanupPolicy::Keep,
        })
    }

    fn execute(
        &self,
        run: &TestRun,
        run_id: &RunId,
        resources: &mut RunResources,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<Executed> {
        let test_data = run
            .test_data
            .clone()
            .unwrap_or_else(|| self.config.test_data_dir.clone());
        let context = BuildContext::synthesize(
            &run.binary,
            Some(&test_data),
            &self.config.manifest,
            self.config.work_dir.as_deref(),
        )?;
        resources.context = Some(context.path().to_path_buf());

        let labels = run_labels(run_id);
        let image = image::build_test_image(self.engine, &context, &labels)?;
        resources.image = Some(image.clone());

        let volume = volume::provision_scratch(self.engine, &labels)?;
        resources.volume = Some(volume.clone());

        let spec = runner::test_container_spec(&image, &volume, &run.credentials, &labels);
        let mut container = runner::launch(self.engine, &spec)?;
        resources.container = Some(container.id.clone());

        let waited =
            collector::await_exit(self.engine, &mut container, run.timeout, run.cancel.as_ref());
        let exit_code = match waited {
            Ok(code) => code,
            Err(e) => {
                if matches!(e.category(), ErrorCategory::Timeout | ErrorCategory::Cancelled) {
                    collector::salvage(self.engine, &container.id, out, err);
                }
                return Err(e);
            }
        };
        let output = collector::capture(self.engine, &container.id)?;
        collector::echo(&output, out, err).map_err(|e| DockerizeError::Resource {
            message: format!("failed to echo container output: {e}"),
        })?;

        Ok(Executed {
            image,
            volume,
            container: container.id,
            binary_digest: context.binary_digest().clone(),
            test_data: context.has_test_data(),
            exit_code,
            output,
        })
    }
}

fn run_labels(run_id: &RunId) -> Labels {
    Labels::from([(RUN_LABEL.to_string(), run_id.to_string())])
}
