//! Mastodon REST API client.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::multipart;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{DestinationPublisher, NewStatus, ProfileUpdate};
use crate::config::Config;
use crate::constants::USER_AGENT;

#[derive(Debug, Serialize)]
struct StatusRequest<'a> {
    status: &'a str,
    media_ids: &'a [String],
    in_reply_to_id: Option<&'a str>,
    sensitive: bool,
}

/// Fields read back from status and media responses.
#[derive(Debug, Deserialize)]
struct Created {
    id: String,
    url: Option<String>,
}

/// Client for the authenticated Mastodon account.
#[derive(Clone)]
pub struct MastodonClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl MastodonClient {
    /// Create a client for the configured instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.mastodon_base_url(),
            token: config.mastodon_token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn check(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            bail!("Mastodon {action} failed: {status} - {body}");
        }
        Ok(response)
    }
}

#[async_trait]
impl DestinationPublisher for MastodonClient {
    async fn publish_status(&self, status: &NewStatus) -> Result<String> {
        let request = StatusRequest {
            status: &status.text,
            media_ids: &status.media_ids,
            in_reply_to_id: status.in_reply_to_id.as_deref(),
            sensitive: status.sensitive,
        };

        let response = self
            .http
            .post(self.endpoint("/api/v1/statuses"))
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .context("Failed to send status to Mastodon")?;

        let created: Created = Self::check(response, "status publish")
            .await?
            .json()
            .await
            .context("Failed to parse Mastodon status response")?;

        info!(status_id = %created.id, url = ?created.url, "Published status");
        Ok(created.id)
    }

    async fn upload_media(&self, bytes: Vec<u8>, alt_text: Option<&str>) -> Result<String> {
        let part = multipart::Part::bytes(bytes).file_name("media");
        let mut form = multipart::Form::new().part("file", part);
        if let Some(alt_text) = alt_text {
            form = form.text("description", alt_text.to_string());
        }

        let response = self
            .http
            .post(self.endpoint("/api/v2/media"))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .context("Failed to send media to Mastodon")?;

        // Only photos reach this path and they process synchronously, so a
        // 202 still carries an id a status can attach.
        let created: Created = Self::check(response, "media upload")
            .await?
            .json()
            .await
            .context("Failed to parse Mastodon media response")?;

        debug!(media_id = %created.id, url = ?created.url, "Uploaded media");
        Ok(created.id)
    }

    async fn pin_status(&self, status_id: &str) -> Result<()> {
        let response = self
            .http
            .post(self.endpoint(&format!("/api/v1/statuses/{status_id}/pin")))
            .bearer_auth(&self.token)
            .send()
            .await
            .context("Failed to send pin request to Mastodon")?;

        Self::check(response, "status pin").await?;
        info!(status_id = %status_id, "Pinned status");
        Ok(())
    }

    async fn update_profile(&self, update: ProfileUpdate) -> Result<()> {
        let mut form = multipart::Form::new()
            .text("bot", update.bot.to_string())
            .text("display_name", update.display_name)
            .text("note", update.bio);
        if let Some(avatar) = update.avatar {
            form = form.part("avatar", multipart::Part::bytes(avatar).file_name("avatar"));
        }

        let response = self
            .http
            .patch(self.endpoint("/api/v1/accounts/update_credentials"))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .context("Failed to send profile update to Mastodon")?;

        Self::check(response, "profile update").await?;
        info!("Updated profile");
        Ok(())
    }
}

impl std::fmt::Debug for MastodonClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MastodonClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
