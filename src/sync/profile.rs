//! Profile mirroring cycle.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::MirrorContext;
use crate::constants::AVATAR_SIZE_MARKER;
use crate::destination::ProfileUpdate;
use crate::error::SyncError;
use crate::rewrite::{canonical_profile_url, expand, unescape};
use crate::source::Profile;
use crate::store::post_key;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileSyncReport {
    /// Destination status pinned in this cycle, if any.
    pub pinned_status_id: Option<String>,
    pub avatar_updated: bool,
}

/// Strip the thumbnail size marker from a source avatar URL so the full
/// size image is fetched. URLs without the marker are returned unchanged.
#[must_use]
pub fn full_size_avatar_url(url: &str) -> String {
    let file_start = url.rfind('/').map_or(0, |i| i + 1);
    let file = &url[file_start..];

    if let Some(pos) = file.rfind(AVATAR_SIZE_MARKER) {
        let rest = &file[pos + AVATAR_SIZE_MARKER.len()..];
        if rest.is_empty() || rest.starts_with('.') {
            return format!("{}{rest}", &url[..file_start + pos]);
        }
    }
    url.to_string()
}

/// Destination bio: a provenance line, then the rewritten source description.
#[must_use]
pub fn compose_bio(profile: &Profile) -> String {
    let mut bio = format!("Mirror of {}", canonical_profile_url(&profile.username));

    let annotations = &profile.description_annotations;
    let description = unescape(&expand(
        &profile.description,
        &annotations.urls,
        &annotations.mentions,
        &[],
    ));
    if !description.trim().is_empty() {
        bio.push_str("\n\n");
        bio.push_str(&description);
    }
    bio
}

/// Mirrors the source profile onto the destination account.
pub struct ProfileSync<'a> {
    ctx: &'a MirrorContext,
}

impl<'a> ProfileSync<'a> {
    #[must_use]
    pub const fn new(ctx: &'a MirrorContext) -> Self {
        Self { ctx }
    }

    /// Run one cycle.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile or avatar cannot be fetched, or the
    /// destination rejects the profile update. A missing or rejected pin is
    /// not an error.
    pub async fn run(&self) -> Result<ProfileSyncReport, SyncError> {
        let profile = self
            .ctx
            .source
            .fetch_profile()
            .await
            .map_err(SyncError::Fetch)?;

        debug!(username = %profile.username, "Loaded source profile");

        let pinned_status_id = match profile.pinned_post_id.as_deref() {
            Some(post_id) => self.pin(post_id).await?,
            None => None,
        };

        let avatar = match profile.avatar_url.as_deref() {
            Some(url) => {
                let url = full_size_avatar_url(url);
                let bytes = self
                    .ctx
                    .source
                    .download(&url)
                    .await
                    .map_err(SyncError::Fetch)?;
                Some(bytes)
            }
            None => None,
        };
        let avatar_updated = avatar.is_some();

        let update = ProfileUpdate {
            bot: true,
            display_name: profile.display_name.clone(),
            bio: compose_bio(&profile),
            avatar,
        };
        self.ctx
            .destination
            .update_profile(update)
            .await
            .map_err(SyncError::Publish)?;

        info!(username = %profile.username, avatar_updated, "Mirrored profile");
        Ok(ProfileSyncReport {
            pinned_status_id,
            avatar_updated,
        })
    }

    /// Pin the mirror of `post_id` if it is known. Best-effort.
    async fn pin(&self, post_id: &str) -> Result<Option<String>, SyncError> {
        let status_id = self
            .ctx
            .store
            .get(&post_key(post_id))
            .await
            .map_err(SyncError::Store)?;

        let Some(status_id) = status_id else {
            debug!(post_id = %post_id, "Pinned post not mirrored, skipping pin");
            return Ok(None);
        };

        match self.ctx.destination.pin_status(&status_id).await {
            Ok(()) => Ok(Some(status_id)),
            Err(e) => {
                warn!(post_id = %post_id, status_id = %status_id, "Failed to pin status: {e:#}");
                Ok(None)
            }
        }
    }
}
