//! Base-image pulls driven by a build manifest.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use common::FakeEngine;
use dockerize_common::error::ErrorCategory;
use dockerize_runtime::image::pull_base_images;

const MULTI_STAGE: &str = "\
FROM golang:1.22 AS build
RUN go test -c -o /agent.test ./pkg/util/containers
FROM --platform=linux/amd64 ubuntu:20.04
from build as final
COPY --from=build /agent.test /agent.test
";

#[test]
fn pulls_external_images_with_content_trust() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("Dockerfile");
    std::fs::write(&manifest, MULTI_STAGE).unwrap();
    let engine = FakeEngine::exiting(0);

    let pulled = pull_base_images(&engine, &manifest, true).expect("pull");

    assert_eq!(pulled, vec!["golang:1.22", "ubuntu:20.04"]);
    assert_eq!(
        engine.calls().pulls,
        vec![
            ("golang:1.22".to_string(), true),
            ("ubuntu:20.04".to_string(), true)
        ]
    );
}

#[test]
fn unsigned_pull_disables_content_trust() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("Dockerfile");
    std::fs::write(&manifest, "FROM alpine:3.19\n").unwrap();
    let engine = FakeEngine::exiting(0);

    let _ = pull_base_images(&engine, &manifest, false).expect("pull");
    assert_eq!(engine.calls().pulls, vec![("alpine:3.19".to_string(), false)]);
}

#[test]
fn first_failed_pull_stops_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("Dockerfile");
    std::fs::write(&manifest, "FROM a:1\nFROM b:1\nFROM c:1\n").unwrap();
    let engine = FakeEngine::exiting(0).failing_pull_of("b:1");

    let err = pull_base_images(&engine, &manifest, true).expect_err("pull");
    assert_eq!(err.category(), ErrorCategory::Resource);
    assert_eq!(engine.calls().pulls.len(), 2);
}

#[test]
fn unreadable_manifest_is_an_input_error() {
    let engine = FakeEngine::exiting(0);
    let err = pull_base_images(&engine, std::path::Path::new("/nonexistent/Dockerfile"), true)
        .expect_err("missing");
    assert_eq!(err.category(), ErrorCategory::Input);
    assert_eq!(engine.calls().total(), 0);
}
