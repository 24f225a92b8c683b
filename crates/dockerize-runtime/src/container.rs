//! Test container record and its lifecycle state machine.
//!
//! `Created -> Running -> Exited(code) | RuntimeError`. A container is never
//! restarted and never leaves a terminal state.

use dockerize_common::error::{DockerizeError, Result};
use dockerize_common::types::{ContainerId, ContainerState};

/// A test container owned by exactly one run.
#[derive(Debug, Clone)]
pub struct TestContainer {
    /// Engine-assigned identifier.
    pub id: ContainerId,
    state: ContainerState,
}

impl TestContainer {
    /// Records a container the engine has just created.
    #[must_use]
    pub const fn new(id: ContainerId) -> Self {
        Self {
            id,
            state: ContainerState::Created,
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ContainerState {
        self.state
    }

    /// Returns the exit status once the container has exited normally.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self.state {
            ContainerState::Exited(code) => Some(code),
            _ => None,
        }
    }

    /// Moves the container to `next`.
    ///
    /// # Errors
    ///
    /// Returns a Runtime error for any transition outside the lifecycle.
    pub fn transition(&mut self, next: ContainerState) -> Result<()> {
        let allowed = matches!(
            (self.state, next),
            (ContainerState::Created, ContainerState::Running)
                | (
                    ContainerState::Created | ContainerState::Running,
                    ContainerState::RuntimeError
                )
                | (ContainerState::Running, ContainerState::Exited(_))
        );
        if !allowed {
            return Err(DockerizeError::Runtime {
                message: format!(
                    "container {} cannot move from {} to {next}",
                    self.id, self.state
                ),
            });
        }
        tracing::debug!(id = %self.id, from = %self.state, to = %next, "container state changed");
        self.state = next;
        Ok(())
    }
}
