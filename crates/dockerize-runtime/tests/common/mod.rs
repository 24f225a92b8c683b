//! In-process container engine double shared by the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use dockerize_common::config::HarnessConfig;
use dockerize_common::error::{DockerizeError, Result};
use dockerize_common::types::{ContainerId, ImageId, LogStream, VolumeName};
use dockerize_runtime::backend::{ContainerEngine, ContainerSpec, Labels, WaitOutcome};
use dockerize_runtime::cancel::CancelToken;
use tempfile::TempDir;

/// Exit status reported for a container that was force-stopped.
pub const KILLED_STATUS: i32 = 137;

/// Contents of a build context as seen at build time.
#[derive(Debug, Clone, Default)]
pub struct ContextSnapshot {
    pub dir: PathBuf,
    pub manifest: String,
    pub entrypoint: String,
    pub files: Vec<String>,
}

/// Every call the harness made, in aggregate.
#[derive(Debug, Clone, Default)]
pub struct Calls {
    pub build: usize,
    pub create_volume: usize,
    pub run: usize,
    pub wait: usize,
    pub logs: Vec<LogStream>,
    pub kill: usize,
    pub remove_container: usize,
    pub remove_volume: usize,
    pub remove_image: usize,
    pub pulls: Vec<(String, bool)>,
    pub contexts: Vec<ContextSnapshot>,
    pub specs: Vec<ContainerSpec>,
    pub volume_labels: Vec<Labels>,
}

impl Calls {
    /// Total number of engine calls of any kind.
    pub fn total(&self) -> usize {
        self.build
            + self.create_volume
            + self.run
            + self.wait
            + self.logs.len()
            + self.kill
            + self.remove_container
            + self.remove_volume
            + self.remove_image
            + self.pulls.len()
    }

    pub fn last_spec(&self) -> &ContainerSpec {
        self.specs.last().expect("a container was run")
    }

    pub fn last_context(&self) -> &ContextSnapshot {
        self.contexts.last().expect("an image was built")
    }
}

/// Scriptable engine double.
#[derive(Debug, Default)]
pub struct FakeEngine {
    exit_code: i32,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    fail_build: bool,
    fail_volume: bool,
    fail_run: bool,
    fail_wait: bool,
    fail_kill: bool,
    fail_removals: bool,
    fail_pull: Option<String>,
    hang: bool,
    next_id: AtomicUsize,
    calls: Mutex<Calls>,
    killed: Mutex<bool>,
    released: Condvar,
}

impl FakeEngine {
    pub fn exiting(code: i32) -> Self {
        Self {
            exit_code: code,
            ..Self::default()
        }
    }

    pub fn with_stdout(mut self, text: &str) -> Self {
        self.stdout = text.as_bytes().to_vec();
        self
    }

    pub fn with_stderr_bytes(mut self, bytes: &[u8]) -> Self {
        self.stderr = bytes.to_vec();
        self
    }

    pub fn with_stderr(self, text: &str) -> Self {
        self.with_stderr_bytes(text.as_bytes())
    }

    pub fn failing_build(mut self) -> Self {
        self.fail_build = true;
        self
    }

    pub fn failing_volume(mut self) -> Self {
        self.fail_volume = true;
        self
    }

    pub fn failing_run(mut self) -> Self {
        self.fail_run = true;
        self
    }

    pub fn failing_wait(mut self) -> Self {
        self.fail_wait = true;
        self
    }

    /// The engine refuses to stop containers.
    pub fn failing_kill(mut self) -> Self {
        self.fail_kill = true;
        self
    }

    pub fn failing_removals(mut self) -> Self {
        self.fail_removals = true;
        self
    }

    pub fn failing_pull_of(mut self, reference: &str) -> Self {
        self.fail_pull = Some(reference.to_string());
        self
    }

    /// Containers never exit on their own; `wait` returns only when killed,
    /// timed out or cancelled.
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn calls(&self) -> Calls {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, f: impl FnOnce(&mut Calls)) {
        f(&mut self.calls.lock().unwrap());
    }

    fn next(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("{prefix}{n:012x}")
    }

    fn removal(&self, what: &str) -> Result<()> {
        if self.fail_removals {
            Err(DockerizeError::Resource {
                message: format!("{what} is in use"),
            })
        } else {
            Ok(())
        }
    }
}

fn snapshot(dir: &Path) -> ContextSnapshot {
    fn walk(root: &Path, dir: &Path, files: &mut Vec<String>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, files);
            } else {
                files.push(
                    path.strip_prefix(root)
                        .unwrap()
                        .to_string_lossy()
                        .into_owned(),
                );
            }
        }
    }

    let mut files = Vec::new();
    walk(dir, dir, &mut files);
    files.sort();
    ContextSnapshot {
        dir: dir.to_path_buf(),
        manifest: std::fs::read_to_string(dir.join("Dockerfile")).unwrap_or_default(),
        entrypoint: std::fs::read_to_string(dir.join("entrypoint.sh")).unwrap_or_default(),
        files,
    }
}

impl ContainerEngine for FakeEngine {
    fn build_image(&self, context: &Path, _labels: &Labels) -> Result<ImageId> {
        self.record(|c| {
            c.build += 1;
            c.contexts.push(snapshot(context));
        });
        if self.fail_build {
            return Err(DockerizeError::Build {
                message: "sha256sum: WARNING: 1 computed checksum did NOT match".into(),
            });
        }
        Ok(ImageId::new(self.next("sha256:")))
    }

    fn create_volume(&self, labels: &Labels) -> Result<VolumeName> {
        self.record(|c| {
            c.create_volume += 1;
            c.volume_labels.push(labels.clone());
        });
        if self.fail_volume {
            return Err(DockerizeError::Resource {
                message: "no space left on device".into(),
            });
        }
        Ok(VolumeName::new(self.next("vol")))
    }

    fn run_container(&self, spec: &ContainerSpec) -> Result<ContainerId> {
        self.record(|c| {
            c.run += 1;
            c.specs.push(spec.clone());
        });
        if self.fail_run {
            return Err(DockerizeError::Runtime {
                message: "error mounting \"/proc\": permission denied".into(),
            });
        }
        Ok(ContainerId::new(self.next("ctr")))
    }

    fn wait(
        &self,
        _id: &ContainerId,
        timeout: Option<Duration>,
        cancel: Option<&CancelToken>,
    ) -> Result<WaitOutcome> {
        self.record(|c| c.wait += 1);
        if self.fail_wait {
            return Err(DockerizeError::Runtime {
                message: "engine connection reset".into(),
            });
        }
        if !self.hang {
            return Ok(WaitOutcome::Exited(self.exit_code));
        }
        let deadline = timeout.map(|limit| Instant::now() + limit);
        let mut killed = self.killed.lock().unwrap();
        loop {
            if *killed {
                return Ok(WaitOutcome::Exited(KILLED_STATUS));
            }
            if cancel.is_some_and(CancelToken::is_cancelled) {
                return Ok(WaitOutcome::Cancelled);
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Ok(WaitOutcome::TimedOut);
            }
            killed = self
                .released
                .wait_timeout(killed, Duration::from_millis(10))
                .unwrap()
                .0;
        }
    }

    fn logs(&self, _id: &ContainerId, stream: LogStream) -> Result<Vec<u8>> {
        self.record(|c| c.logs.push(stream));
        Ok(match stream {
            LogStream::Stdout => self.stdout.clone(),
            LogStream::Stderr => self.stderr.clone(),
        })
    }

    fn kill(&self, _id: &ContainerId) -> Result<()> {
        self.record(|c| c.kill += 1);
        if self.fail_kill {
            return Err(DockerizeError::Runtime {
                message: "engine did not confirm kill".into(),
            });
        }
        *self.killed.lock().unwrap() = true;
        self.released.notify_all();
        Ok(())
    }

    fn remove_container(&self, _id: &ContainerId) -> Result<()> {
        self.record(|c| c.remove_container += 1);
        self.removal("container")
    }

    fn remove_volume(&self, _name: &VolumeName) -> Result<()> {
        self.record(|c| c.remove_volume += 1);
        self.removal("volume")
    }

    fn remove_image(&self, _id: &ImageId) -> Result<()> {
        self.record(|c| c.remove_image += 1);
        self.removal("image")
    }

    fn pull_image(&self, reference: &str, content_trust: bool) -> Result<()> {
        self.record(|c| c.pulls.push((reference.to_string(), content_trust)));
        if self.fail_pull.as_deref() == Some(reference) {
            return Err(DockerizeError::Resource {
                message: format!("failed to pull {reference}"),
            });
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Scratch filesystem for one test: a fake binary and an isolated work dir.
pub struct Fixture {
    pub root: TempDir,
    pub binary: PathBuf,
    pub config: HarnessConfig,
}

impl Fixture {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let binary = root.path().join("agent.test");
        std::fs::write(&binary, b"\x7fELF fake test binary").unwrap();
        let work = root.path().join("work");
        std::fs::create_dir_all(&work).unwrap();
        let config = HarnessConfig {
            work_dir: Some(work),
            test_data_dir: root.path().join("testdata"),
            ..HarnessConfig::default()
        };
        Self {
            root,
            binary,
            config,
        }
    }

    /// Creates the conventional test-data directory with a few fixtures.
    pub fn with_test_data(self) -> Self {
        let data = self.root.path().join("testdata");
        std::fs::create_dir_all(data.join("cgroup")).unwrap();
        std::fs::write(data.join("cgroup/self.txt"), "0::/docker/abc").unwrap();
        std::fs::write(data.join("expected.json"), "{\"containerized\":true}").unwrap();
        self
    }

    pub fn work_dir(&self) -> PathBuf {
        self.root.path().join("work")
    }

    /// Number of entries currently in the work dir.
    pub fn contexts_on_disk(&self) -> usize {
        std::fs::read_dir(self.work_dir()).unwrap().count()
    }
}
