//! The network posts are mirrored to.

mod mastodon;

pub use mastodon::MastodonClient;

use anyhow::Result;
use async_trait::async_trait;

/// A status ready to publish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewStatus {
    pub text: String,
    pub media_ids: Vec<String>,
    pub in_reply_to_id: Option<String>,
    pub sensitive: bool,
}

/// A full replacement of the destination account's public profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub bot: bool,
    pub display_name: String,
    pub bio: String,
    pub avatar: Option<Vec<u8>>,
}

/// Write access to the destination account.
#[async_trait]
pub trait DestinationPublisher: Send + Sync {
    /// Publish a status and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination rejects the status.
    async fn publish_status(&self, status: &NewStatus) -> Result<String>;

    /// Upload a media file and return its id for attaching to a status.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination rejects the upload.
    async fn upload_media(&self, bytes: Vec<u8>, alt_text: Option<&str>) -> Result<String>;

    /// Pin a published status to the account's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination rejects the pin.
    async fn pin_status(&self, status_id: &str) -> Result<()>;

    /// Replace the account's profile fields in one request.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination rejects the update.
    async fn update_profile(&self, update: ProfileUpdate) -> Result<()>;
}
