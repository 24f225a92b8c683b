//! Container-based test harness for the dockerize workspace.
//!
//! A run moves strictly forward through the stages below, each in its own
//! module:
//!
//! 1. [`context`]: synthesize a throwaway build context.
//! 2. [`image`]: build the test image from it.
//! 3. [`volume`]: provision an ephemeral scratch volume.
//! 4. [`runner`]: launch the container with host visibility.
//! 5. [`collector`]: wait for termination and capture both streams.
//! 6. [`cleanup`]: release resources according to the run's policy.
//!
//! [`harness::Harness`] drives the stages against a
//! [`backend::ContainerEngine`] handle supplied by the caller.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod backend;
pub mod cancel;
pub mod cleanup;
pub mod collector;
pub mod container;
pub mod context;
pub mod harness;
pub mod hash;
pub mod image;
pub mod manifest;
pub mod registry;
pub mod runner;
pub mod volume;
