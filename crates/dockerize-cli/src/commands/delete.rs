//! `dockerize delete-tag`: remove a tag from the registry hub.

use clap::Args;
use dockerize_common::constants::DEFAULT_HUB_API;
use dockerize_runtime::registry::HubClient;

/// Arguments for the `delete-tag` command.
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Organization owning the repository.
    pub org: String,

    /// Repository name.
    pub image: String,

    /// Tag to delete.
    pub tag: String,

    /// Hub API token sent as a JWT bearer.
    #[arg(long, env = "DOCKER_HUB_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Hub API base URL.
    #[arg(long, default_value = DEFAULT_HUB_API, hide = true)]
    pub hub_url: String,
}

/// Executes the `delete-tag` command.
///
/// # Errors
///
/// Returns an error if the hub rejects the deletion.
pub fn execute(args: &DeleteArgs) -> anyhow::Result<()> {
    let client = HubClient::with_base(&args.hub_url)?;
    client.delete_tag(&args.org, &args.image, &args.tag, &args.token)?;
    eprintln!("deleted {}/{}:{}", args.org, args.image, args.tag);
    Ok(())
}
