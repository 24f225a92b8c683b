//! Build manifest and entrypoint generation, plus base-image extraction.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use dockerize_common::config::ManifestConfig;
use dockerize_common::constants::{
    CONTAINER_BINARY_PATH, CONTAINER_ENTRYPOINT_PATH, CONTAINER_TEST_DATA_PATH, ENTRYPOINT_FILE,
    ENV_AGENT_MARKER, ENV_REGISTRY_TOKEN, ENV_REGISTRY_URL, ENV_REGISTRY_USER, TEST_BINARY_FILE,
    TEST_DATA_CONTEXT_DIR,
};

/// In-image location of the compose tool.
pub const COMPOSE_PATH: &str = "/usr/bin/compose";

/// Renders the build manifest for a test image.
///
/// The compose tool is downloaded at the pinned version and verified against
/// the pinned hash before it is made executable; a mismatch fails the build.
#[must_use]
pub fn render_manifest(config: &ManifestConfig, include_test_data: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "FROM {}", config.base_image);
    let _ = writeln!(out, "# Install the container engine CLI");
    let _ = writeln!(
        out,
        "COPY --from={} /usr/local/bin/docker /usr/bin/docker",
        config.engine_cli_image
    );
    out.push('\n');
    let _ = writeln!(out, "# Install the compose tool");
    let _ = writeln!(out, "ARG COMPOSE_VERSION={}", config.compose_version);
    let _ = writeln!(out, "ARG COMPOSE_SHA256={}", config.compose_sha256.as_hex());
    let _ = writeln!(
        out,
        "RUN apt-get update && apt-get install -y ca-certificates curl"
    );
    let _ = writeln!(
        out,
        "RUN curl -SL \"https://github.com/docker/compose/releases/download/v${{COMPOSE_VERSION}}/docker-compose-linux-{}\" -o {COMPOSE_PATH}",
        config.compose_arch
    );
    let _ = writeln!(
        out,
        "RUN echo \"${{COMPOSE_SHA256}}  {COMPOSE_PATH}\" | sha256sum --check"
    );
    let _ = writeln!(out, "RUN chmod +x {COMPOSE_PATH}");
    out.push('\n');
    let _ = writeln!(out, "COPY {ENTRYPOINT_FILE} {CONTAINER_ENTRYPOINT_PATH}");
    let _ = writeln!(out, "RUN chmod +x {CONTAINER_ENTRYPOINT_PATH}");
    out.push('\n');
    let _ = writeln!(out, "ENV {ENV_AGENT_MARKER}=yes");
    let _ = writeln!(out, "WORKDIR /");
    let _ = writeln!(out, "COPY {TEST_BINARY_FILE} {CONTAINER_BINARY_PATH}");
    let _ = writeln!(out, "ENTRYPOINT [\"{CONTAINER_ENTRYPOINT_PATH}\"]");
    if include_test_data {
        let _ = writeln!(out, "COPY {TEST_DATA_CONTEXT_DIR} {CONTAINER_TEST_DATA_PATH}");
    }
    out
}

/// Renders the POSIX shell entrypoint.
///
/// Logs in to the registry by piping the token on stdin, then replaces the
/// shell with the test binary so it becomes the container's main process.
#[must_use]
pub fn render_entrypoint() -> String {
    format!(
        "#!/bin/sh\n\
         # Authenticate to the registry\n\
         echo \"${ENV_REGISTRY_TOKEN}\" | docker login --username \"${ENV_REGISTRY_USER}\" --password-stdin \"${ENV_REGISTRY_URL}\"\n\
         # Run the tests\n\
         exec {CONTAINER_BINARY_PATH}\n"
    )
}

/// Image references found in a build manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseImages {
    /// External images to pull, sorted.
    pub images: BTreeSet<String>,
    /// Intermediate stage names that were dropped from `images`.
    pub stages: BTreeSet<String>,
}

/// Extracts the base images referenced by `FROM` lines.
///
/// Stage names declared with `FROM <image> AS <name>` are removed from the
/// result, so `FROM builder` after such a declaration is not pulled. Leading
/// `--flag=value` options such as `--platform` are skipped.
#[must_use]
pub fn parse_base_images(manifest: &str) -> BaseImages {
    let mut images = BTreeSet::new();
    let mut stages = BTreeSet::new();

    for line in manifest.lines() {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((first, rest)) = words.split_first() else {
            continue;
        };
        if !first.eq_ignore_ascii_case("from") {
            continue;
        }
        let rest: Vec<&str> = rest
            .iter()
            .copied()
            .skip_while(|w| w.starts_with("--"))
            .collect();
        let Some(image) = rest.first() else {
            continue;
        };
        let _ = images.insert((*image).to_string());
        if rest.len() >= 3 && rest[1].eq_ignore_ascii_case("as") {
            let _ = stages.insert(rest[2].to_string());
        }
    }

    images.retain(|image| !stages.contains(image));
    BaseImages { images, stages }
}
