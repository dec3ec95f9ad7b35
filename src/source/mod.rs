//! The network posts are mirrored from.

mod models;
mod twitter;

pub use models::*;
pub use twitter::TwitterClient;

use anyhow::Result;
use async_trait::async_trait;

/// Read access to the source account.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetch the account's non-reply posts newer than `since_id`, newest
    /// first, with the media catalog for their attachments. All pages are
    /// read, so a cursor taken from the newest post never skips older ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is unreachable or rejects the request.
    async fn fetch_posts(&self, since_id: Option<&str>) -> Result<Timeline>;

    /// Fetch the account's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is unreachable or rejects the request.
    async fn fetch_profile(&self) -> Result<Profile>;

    /// Download raw bytes of a media file or avatar hosted by the source.
    ///
    /// # Errors
    ///
    /// Returns an error if the download fails.
    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}
