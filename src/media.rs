//! Re-hosting of post attachments on the destination.

use std::collections::HashMap;

use anyhow::{Context, Result};
use futures_util::future::try_join_all;
use tracing::debug;

use crate::destination::DestinationPublisher;
use crate::source::{MediaItem, SourceFetcher};

/// Upload every attachment in `media_keys` that the catalog can serve.
///
/// Keys missing from `catalog`, or whose item has no download URL, are
/// skipped. Uploads run concurrently and the returned ids follow the order
/// of `media_keys`, whichever upload finishes first. A single failed
/// download or upload fails the whole call; media already uploaded by
/// sibling tasks is left on the destination.
///
/// # Errors
///
/// Returns the first download or upload error.
pub async fn upload_all(
    source: &dyn SourceFetcher,
    destination: &dyn DestinationPublisher,
    media_keys: &[String],
    catalog: &[MediaItem],
) -> Result<Vec<String>> {
    let mut wanted: Vec<(&str, &str, Option<&str>)> = Vec::new();
    for key in media_keys {
        if wanted.iter().any(|(k, _, _)| *k == key.as_str()) {
            continue;
        }
        let item = catalog.iter().find(|m| &m.media_key == key);
        match item.and_then(|m| m.source_url.as_deref().map(|url| (m, url))) {
            Some((item, url)) => wanted.push((key.as_str(), url, item.alt_text.as_deref())),
            None => debug!(media_key = %key, "Skipping media without a downloadable URL"),
        }
    }

    let uploads = wanted.into_iter().map(|(key, url, alt_text)| async move {
        let bytes = source
            .download(url)
            .await
            .with_context(|| format!("Failed to fetch media {key}"))?;
        let id = destination
            .upload_media(bytes, alt_text)
            .await
            .with_context(|| format!("Failed to upload media {key}"))?;
        debug!(media_key = %key, media_id = %id, "Re-hosted media");
        Ok::<_, anyhow::Error>((key, id))
    });

    let mut uploaded: HashMap<&str, String> = try_join_all(uploads).await?.into_iter().collect();

    Ok(media_keys
        .iter()
        .filter_map(|key| uploaded.remove(key.as_str()))
        .collect())
}
