//! Post mirroring cycle.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::MirrorContext;
use crate::constants::MIRROR_RECORD_TTL;
use crate::destination::NewStatus;
use crate::error::SyncError;
use crate::media;
use crate::rewrite::{expand, unescape};
use crate::source::{MediaItem, Post};
use crate::store::{post_key, LATEST_KEY};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostSyncReport {
    /// Posts returned by the source since the previous cursor.
    pub fetched: usize,
    /// Posts published to the destination in this cycle.
    pub published: usize,
    /// Cursor after the cycle.
    pub cursor: Option<String>,
}

/// Mirrors new source posts to the destination, oldest first.
///
/// If a publish fails mid-batch, posts already published keep their
/// mappings but the cursor stays put, so the next cycle fetches the same
/// batch again and republishes them.
pub struct PostSync<'a> {
    ctx: &'a MirrorContext,
}

impl<'a> PostSync<'a> {
    #[must_use]
    pub const fn new(ctx: &'a MirrorContext) -> Self {
        Self { ctx }
    }

    /// Run one cycle.
    ///
    /// # Errors
    ///
    /// Returns the first fetch, publish or store failure. Remaining posts in
    /// the batch are not attempted and the cursor is not advanced.
    pub async fn run(&self) -> Result<PostSyncReport, SyncError> {
        let store = &self.ctx.store;
        let cursor = store.get(LATEST_KEY).await.map_err(SyncError::Store)?;

        let timeline = self
            .ctx
            .source
            .fetch_posts(cursor.as_deref())
            .await
            .map_err(SyncError::Fetch)?;

        info!(count = timeline.posts.len(), since_id = ?cursor, "Loaded posts");

        let mut published = 0;
        for post in timeline.posts.iter().rev() {
            self.mirror_post(post, &timeline.media).await?;
            published += 1;
        }

        let Some(newest) = timeline.posts.first() else {
            return Ok(PostSyncReport {
                fetched: 0,
                published,
                cursor,
            });
        };

        store
            .put(LATEST_KEY, &newest.id, None)
            .await
            .map_err(SyncError::Store)?;
        debug!(latest = %newest.id, "Advanced cursor");

        match store.purge_expired().await {
            Ok(removed) if removed > 0 => debug!(removed, "Purged expired mappings"),
            Ok(_) => {}
            Err(e) => warn!("Failed to purge expired mappings: {e:#}"),
        }

        Ok(PostSyncReport {
            fetched: timeline.posts.len(),
            published,
            cursor: Some(newest.id.clone()),
        })
    }

    /// Publish one post and record its mapping. Returns the destination status id.
    async fn mirror_post(&self, post: &Post, catalog: &[MediaItem]) -> Result<String, SyncError> {
        debug!(post_id = %post.id, conversation_id = %post.conversation_id, "Mirroring post");

        let in_reply_to_id = self.reply_target(post).await?;

        let annotations = &post.annotations;
        let text = unescape(&expand(
            &post.text,
            &annotations.urls,
            &annotations.mentions,
            &post.attachments,
        ));

        let media_ids = media::upload_all(
            self.ctx.source.as_ref(),
            self.ctx.destination.as_ref(),
            &post.attachments,
            catalog,
        )
        .await
        .map_err(SyncError::Publish)?;

        let status = NewStatus {
            text,
            media_ids,
            in_reply_to_id,
            sensitive: post.possibly_sensitive,
        };
        let status_id = self
            .ctx
            .destination
            .publish_status(&status)
            .await
            .map_err(SyncError::Publish)?;

        self.ctx
            .store
            .put(&post_key(&post.id), &status_id, Some(MIRROR_RECORD_TTL))
            .await
            .map_err(SyncError::Store)?;

        info!(post_id = %post.id, status_id = %status_id, "Mirrored post");
        Ok(status_id)
    }

    /// Destination id of the conversation root, when it was mirrored.
    async fn reply_target(&self, post: &Post) -> Result<Option<String>, SyncError> {
        if post.is_conversation_root() {
            return Ok(None);
        }

        let target = self
            .ctx
            .store
            .get(&post_key(&post.conversation_id))
            .await
            .map_err(SyncError::Store)?;

        if target.is_none() {
            debug!(
                post_id = %post.id,
                conversation_id = %post.conversation_id,
                "Conversation root not mirrored, publishing without reply target"
            );
        }
        Ok(target)
    }
}
