//! Registry hub client used for tag maintenance.

use std::time::Duration;

use dockerize_common::constants::DEFAULT_HUB_API;
use dockerize_common::error::{DockerizeError, Result};

/// Blocking client for the registry hub's repository API.
#[derive(Debug, Clone)]
pub struct HubClient {
    api_base: String,
    http: reqwest::blocking::Client,
}

impl HubClient {
    /// Creates a client for the public hub.
    ///
    /// # Errors
    ///
    /// Returns a Resource error if the HTTP client cannot be initialized.
    pub fn new() -> Result<Self> {
        Self::with_base(DEFAULT_HUB_API)
    }

    /// Creates a client for a hub served at `api_base`.
    ///
    /// # Errors
    ///
    /// Returns an Input error for an empty base URL and a Resource error if
    /// the HTTP client cannot be initialized.
    pub fn with_base(api_base: impl Into<String>) -> Result<Self> {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        if api_base.is_empty() {
            return Err(DockerizeError::Input {
                message: "hub API base URL must not be empty".into(),
            });
        }
        let http = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| DockerizeError::Resource {
                message: format!("failed to initialize HTTP client: {e}"),
            })?;
        Ok(Self { api_base, http })
    }

    /// Returns the API URL of one tag of a repository.
    #[must_use]
    pub fn tag_url(&self, org: &str, image: &str, tag: &str) -> String {
        format!(
            "{}/v2/repositories/{org}/{image}/tags/{tag}/",
            self.api_base
        )
    }

    /// Deletes `org/image:tag` from the hub.
    ///
    /// # Errors
    ///
    /// Returns an Input error if any argument is empty and a Resource error
    /// if the request fails or the hub answers with a non-success status.
    pub fn delete_tag(&self, org: &str, image: &str, tag: &str, token: &str) -> Result<()> {
        for (field, value) in [("org", org), ("image", image), ("tag", tag), ("token", token)] {
            if value.trim().is_empty() {
                return Err(DockerizeError::Input {
                    message: format!("{field} must not be empty"),
                });
            }
        }

        let url = self.tag_url(org, image, tag);
        tracing::info!(%url, "deleting tag");
        let response = self
            .http
            .delete(&url)
            .header(reqwest::header::AUTHORIZATION, format!("JWT {token}"))
            .send()
            .map_err(|e| DockerizeError::Resource {
                message: format!("failed to delete {org}/{image}:{tag}: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DockerizeError::Resource {
                message: format!("HTTP {status} deleting {org}/{image}:{tag}"),
            });
        }
        tracing::info!(org, image, tag, "tag deleted");
        Ok(())
    }
}
