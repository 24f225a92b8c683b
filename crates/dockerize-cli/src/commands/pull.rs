//! `dockerize pull-base-images`: pre-pull the images a manifest builds on.

use std::path::PathBuf;

use clap::Args;
use dockerize_runtime::backend;
use dockerize_runtime::image::pull_base_images;

/// Arguments for the `pull-base-images` command.
#[derive(Args, Debug)]
pub struct PullArgs {
    /// Build manifest to scan for `FROM` lines.
    pub manifest: PathBuf,

    /// Pull without requiring signed images.
    #[arg(long)]
    pub no_signed_pull: bool,
}

/// Executes the `pull-base-images` command.
///
/// # Errors
///
/// Returns an error if the manifest cannot be read or any pull fails.
pub fn execute(args: &PullArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let engine = backend::connect(&config)?;
    let pulled = pull_base_images(engine.as_ref(), &args.manifest, !args.no_signed_pull)?;
    for image in &pulled {
        eprintln!("pulled {image}");
    }
    Ok(())
}
