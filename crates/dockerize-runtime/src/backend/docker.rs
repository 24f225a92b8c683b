//! Container engine backed by the `docker` command-line client.
//!
//! Each trait call spawns one engine CLI process and blocks until it exits.
//! `wait` and `kill` are bounded: their process is killed and reaped once
//! the deadline passes, so an unresponsive daemon cannot hang a run.
//! Environment values for the test container are placed in the CLI's own
//! environment and referenced by name (`-e NAME`), so secrets never appear
//! on a command line.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::time::{Duration, Instant};

use dockerize_common::constants::ENV_CONTENT_TRUST;
use dockerize_common::error::{DockerizeError, Result};
use dockerize_common::types::{ContainerId, ImageId, LogStream, VolumeName};
use wait_timeout::ChildExt;

use super::{ContainerEngine, ContainerSpec, Labels, WaitOutcome};
use crate::cancel::CancelToken;

const STDERR_TAIL_LINES: usize = 20;

/// Longest single block on an engine process before the cancel flag is
/// checked again.
const CANCEL_POLL: Duration = Duration::from_millis(100);

/// Upper bound on a `kill` invocation.
const KILL_TIMEOUT: Duration = Duration::from_secs(10);

/// How a bounded engine invocation ended.
#[derive(Debug)]
enum Waited<T> {
    Finished(T),
    TimedOut,
    Cancelled,
}

/// Engine client that shells out to the `docker` CLI.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: PathBuf,
}

impl DockerCli {
    /// Locates the engine binary on `PATH` (or validates an absolute path).
    ///
    /// # Errors
    ///
    /// Returns an Input error if the binary cannot be found.
    pub fn locate(binary: &str) -> Result<Self> {
        let path = which::which(binary).map_err(|_| DockerizeError::Input {
            message: format!("container engine binary not found: {binary}"),
        })?;
        tracing::debug!(binary = %path.display(), "container engine located");
        Ok(Self { binary: path })
    }

    /// Uses the given binary without looking it up.
    #[must_use]
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Returns the engine binary path.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Builds the `build` invocation for a context directory.
    #[must_use]
    pub fn build_command(&self, context: &Path, labels: &Labels) -> Command {
        let mut cmd = Command::new(&self.binary);
        let _ = cmd.args(["build", "--rm", "--quiet"]);
        push_labels(&mut cmd, labels);
        let _ = cmd.arg(context);
        cmd
    }

    /// Builds the `volume create` invocation.
    #[must_use]
    pub fn volume_command(&self, labels: &Labels) -> Command {
        let mut cmd = Command::new(&self.binary);
        let _ = cmd.args(["volume", "create"]);
        push_labels(&mut cmd, labels);
        cmd
    }

    /// Builds the detached `run` invocation for a container spec.
    ///
    /// Flags always precede the image reference.
    #[must_use]
    pub fn run_command(&self, spec: &ContainerSpec) -> Command {
        let mut cmd = Command::new(&self.binary);
        let _ = cmd.args(["run", "--detach"]);
        if spec.host_pid {
            let _ = cmd.arg("--pid=host");
        }
        if spec.host_cgroupns {
            let _ = cmd.arg("--cgroupns=host");
        }
        push_labels(&mut cmd, &spec.labels);
        for (key, value) in &spec.env {
            let _ = cmd.arg("--env").arg(key).env(key, value);
        }
        for mount in &spec.mounts {
            let _ = cmd
                .arg("--volume")
                .arg(format!("{}:{}:{}", mount.source, mount.target, mount.mode));
        }
        let _ = cmd.arg(spec.image.as_str());
        cmd
    }

    /// Builds the `wait` invocation, which prints the exit status.
    #[must_use]
    pub fn wait_command(&self, id: &ContainerId) -> Command {
        self.command(["wait", id.as_str()])
    }

    fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.binary);
        let _ = cmd.args(args);
        cmd
    }
}

impl ContainerEngine for DockerCli {
    fn build_image(&self, context: &Path, labels: &Labels) -> Result<ImageId> {
        tracing::info!(context = %context.display(), "building test image");
        let output = run_checked(&mut self.build_command(context, labels), "build image")
            .map_err(|message| DockerizeError::Build { message })?;
        let id = last_line(&output.stdout).ok_or_else(|| DockerizeError::Build {
            message: "engine returned no image id".into(),
        })?;
        Ok(ImageId::new(id))
    }

    fn create_volume(&self, labels: &Labels) -> Result<VolumeName> {
        let output = run_checked(&mut self.volume_command(labels), "create volume")
            .map_err(|message| DockerizeError::Resource { message })?;
        let name = last_line(&output.stdout).ok_or_else(|| DockerizeError::Resource {
            message: "engine returned no volume name".into(),
        })?;
        Ok(VolumeName::new(name))
    }

    fn run_container(&self, spec: &ContainerSpec) -> Result<ContainerId> {
        let output = run_checked(&mut self.run_command(spec), "start container")
            .map_err(|message| DockerizeError::Runtime { message })?;
        let id = last_line(&output.stdout).ok_or_else(|| DockerizeError::Runtime {
            message: "engine returned no container id".into(),
        })?;
        Ok(ContainerId::new(id))
    }

    fn wait(
        &self,
        id: &ContainerId,
        timeout: Option<Duration>,
        cancel: Option<&CancelToken>,
    ) -> Result<WaitOutcome> {
        let waited = run_bounded(&mut self.wait_command(id), "wait for container", timeout, cancel)
            .map_err(|message| DockerizeError::Runtime { message })?;
        match waited {
            Waited::Finished(output) => Ok(WaitOutcome::Exited(parse_exit_code(
                &String::from_utf8_lossy(&output.stdout),
            )?)),
            Waited::TimedOut => Ok(WaitOutcome::TimedOut),
            Waited::Cancelled => Ok(WaitOutcome::Cancelled),
        }
    }

    fn logs(&self, id: &ContainerId, stream: LogStream) -> Result<Vec<u8>> {
        let output = run_checked(
            &mut self.command(["logs", id.as_str()]),
            &format!("fetch {stream} logs"),
        )
        .map_err(|message| DockerizeError::Runtime { message })?;
        Ok(match stream {
            LogStream::Stdout => output.stdout,
            LogStream::Stderr => output.stderr,
        })
    }

    fn kill(&self, id: &ContainerId) -> Result<()> {
        let waited = run_bounded(
            &mut self.command(["kill", id.as_str()]),
            "kill container",
            Some(KILL_TIMEOUT),
            None,
        )
        .map_err(|message| DockerizeError::Runtime { message })?;
        match waited {
            Waited::Finished(_) => Ok(()),
            Waited::TimedOut | Waited::Cancelled => Err(DockerizeError::Runtime {
                message: format!("engine did not confirm kill of {id} within {KILL_TIMEOUT:?}"),
            }),
        }
    }

    fn remove_container(&self, id: &ContainerId) -> Result<()> {
        let _ = run_checked(
            &mut self.command(["rm", "--force", "--volumes", id.as_str()]),
            "remove container",
        )
        .map_err(|message| DockerizeError::Resource { message })?;
        Ok(())
    }

    fn remove_volume(&self, name: &VolumeName) -> Result<()> {
        let _ = run_checked(
            &mut self.command(["volume", "rm", "--force", name.as_str()]),
            "remove volume",
        )
        .map_err(|message| DockerizeError::Resource { message })?;
        Ok(())
    }

    fn remove_image(&self, id: &ImageId) -> Result<()> {
        let _ = run_checked(&mut self.command(["image", "rm", id.as_str()]), "remove image")
            .map_err(|message| DockerizeError::Resource { message })?;
        Ok(())
    }

    fn pull_image(&self, reference: &str, content_trust: bool) -> Result<()> {
        let mut cmd = self.command(["pull", reference]);
        if content_trust {
            let _ = cmd.env(ENV_CONTENT_TRUST, "1");
        }
        let output = run_checked(&mut cmd, &format!("pull {reference}"))
            .map_err(|message| DockerizeError::Resource { message })?;
        tracing::info!(
            image = reference,
            content_trust,
            status = %String::from_utf8_lossy(&output.stdout).trim(),
            "image pulled"
        );
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.command(["info"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    }
}

fn push_labels(cmd: &mut Command, labels: &Labels) {
    for (key, value) in labels {
        let _ = cmd.arg("--label").arg(format!("{key}={value}"));
    }
}

/// Runs an engine command to completion, returning its output on success
/// and a readable failure description otherwise.
fn run_checked(cmd: &mut Command, action: &str) -> std::result::Result<Output, String> {
    tracing::debug!(command = %render(cmd), "invoking container engine");
    let output = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|e| format!("failed to {action}: {e}"))?;
    checked(output, action)
}

fn checked(output: Output, action: &str) -> std::result::Result<Output, String> {
    if output.status.success() {
        Ok(output)
    } else {
        Err(format!(
            "failed to {action} ({}): {}",
            output.status,
            stderr_tail(&output.stderr)
        ))
    }
}

/// Runs an engine command that may block indefinitely.
///
/// Once `timeout` elapses or `cancel` fires, the engine process is killed
/// and reaped instead of being waited on.
fn run_bounded(
    cmd: &mut Command,
    action: &str,
    timeout: Option<Duration>,
    cancel: Option<&CancelToken>,
) -> std::result::Result<Waited<Output>, String> {
    tracing::debug!(command = %render(cmd), ?timeout, "invoking container engine");
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("failed to {action}: {e}"))?;

    match wait_child(&mut child, timeout, cancel).map_err(|e| format!("failed to {action}: {e}"))? {
        Waited::Finished(_) => {
            let output = child
                .wait_with_output()
                .map_err(|e| format!("failed to {action}: {e}"))?;
            checked(output, action).map(Waited::Finished)
        }
        Waited::TimedOut => {
            reap(&mut child, action);
            Ok(Waited::TimedOut)
        }
        Waited::Cancelled => {
            reap(&mut child, action);
            Ok(Waited::Cancelled)
        }
    }
}

/// Blocks on a child in slices of at most [`CANCEL_POLL`] so the cancel
/// flag is observed while the deadline still governs the total wait.
fn wait_child(
    child: &mut Child,
    timeout: Option<Duration>,
    cancel: Option<&CancelToken>,
) -> std::io::Result<Waited<ExitStatus>> {
    let deadline = timeout.and_then(|limit| Instant::now().checked_add(limit));
    loop {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Ok(Waited::Cancelled);
        }
        let slice = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Ok(Waited::TimedOut);
                }
                remaining.min(CANCEL_POLL)
            }
            None if cancel.is_none() => return child.wait().map(Waited::Finished),
            None => CANCEL_POLL,
        };
        if let Some(status) = child.wait_timeout(slice)? {
            return Ok(Waited::Finished(status));
        }
    }
}

fn reap(child: &mut Child, action: &str) {
    if let Err(e) = child.kill() {
        tracing::warn!(action, error = %e, "failed to terminate engine process");
    }
    if let Err(e) = child.wait() {
        tracing::warn!(action, error = %e, "failed to reap engine process");
    }
}

/// Renders program and arguments for logs. Environment values are omitted.
fn render(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

fn last_line(bytes: &[u8]) -> Option<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .map(str::to_owned)
}

fn stderr_tail(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Parses the status printed by `wait`.
///
/// # Errors
///
/// Returns a Runtime error if the output is not an integer.
pub fn parse_exit_code(raw: &str) -> Result<i32> {
    let trimmed = raw.trim();
    trimmed.parse::<i32>().map_err(|_| DockerizeError::Runtime {
        message: format!("engine reported a non-numeric exit status: {trimmed:?}"),
    })
}
