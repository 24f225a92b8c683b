//! CLI command definitions and dispatch.

pub mod delete;
pub mod pull;
pub mod test;

use std::path::Path;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dockerize_common::config::HarnessConfig;

/// dockerize: run test binaries inside host-visible containers.
#[derive(Parser, Debug)]
#[command(name = "dockerize", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Path to a YAML harness configuration file.
    #[arg(long, global = true, env = "DOCKERIZE_CONFIG")]
    pub config: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a test image around a binary, run it, and exit with its status.
    Test(test::TestArgs),
    /// Pull every base image referenced by a build manifest.
    PullBaseImages(pull::PullArgs),
    /// Delete one tag of a repository on the registry hub.
    DeleteTag(delete::DeleteArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Test(args) => test::execute(&args, cli.config.as_deref()),
        Command::PullBaseImages(args) => pull::execute(&args, cli.config.as_deref()),
        Command::DeleteTag(args) => delete::execute(&args),
    }
}

/// Loads the harness configuration, falling back to defaults.
fn load_config(path: Option<&str>) -> anyhow::Result<HarnessConfig> {
    let Some(path) = path else {
        return Ok(HarnessConfig::default());
    };
    let config = HarnessConfig::from_yaml_file(Path::new(path))
        .with_context(|| format!("failed to load configuration from {path}"))?;
    tracing::debug!(path, "configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_test_command_with_all_flags() {
        let cli = Cli::try_parse_from([
            "dockerize",
            "test",
            "./agent.test",
            "--test-data",
            "./fixtures",
            "--skip-cleanup",
            "--timeout",
            "600",
            "--config",
            "harness.yaml",
            "--json",
        ])
        .expect("parse");
        assert_eq!(cli.config.as_deref(), Some("harness.yaml"));
        let Command::Test(args) = cli.command else {
            panic!("expected test command");
        };
        assert_eq!(args.binary.to_str(), Some("./agent.test"));
        assert_eq!(args.test_data.as_deref().and_then(|p| p.to_str()), Some("./fixtures"));
        assert!(args.skip_cleanup);
        assert_eq!(args.timeout, Some(600));
        assert!(args.json);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(Cli::try_parse_from(["dockerize", "test", "bin", "--timeout", "0"]).is_err());
    }

    #[test]
    fn parses_pull_base_images() {
        let cli = Cli::try_parse_from(["dockerize", "pull-base-images", "Dockerfile", "--no-signed-pull"])
            .expect("parse");
        let Command::PullBaseImages(args) = cli.command else {
            panic!("expected pull command");
        };
        assert!(args.no_signed_pull);
    }

    #[test]
    fn parses_delete_tag_with_token() {
        let cli = Cli::try_parse_from([
            "dockerize",
            "delete-tag",
            "datadog",
            "agent",
            "7.52.0-rc.1",
            "--token",
            "jwt",
        ])
        .expect("parse");
        let Command::DeleteTag(args) = cli.command else {
            panic!("expected delete command");
        };
        assert_eq!(args.tag, "7.52.0-rc.1");
        assert_eq!(args.token, "jwt");
    }

    #[test]
    fn missing_config_path_yields_defaults() {
        assert_eq!(load_config(None).expect("config"), HarnessConfig::default());
    }

    #[test]
    fn unreadable_config_is_an_error() {
        assert!(load_config(Some("/nonexistent/harness.yaml")).is_err());
    }
}
