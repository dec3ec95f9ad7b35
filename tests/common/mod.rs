//! In-process fakes for the source and destination networks.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use tweet_mirror::destination::{DestinationPublisher, NewStatus, ProfileUpdate};
use tweet_mirror::source::{Annotations, MediaItem, Post, Profile, SourceFetcher, Timeline};
use tweet_mirror::store::{MemoryStore, MirrorStore};
use tweet_mirror::sync::MirrorContext;

pub fn post(id: &str, conversation_id: &str, text: &str) -> Post {
    Post {
        id: id.to_string(),
        text: text.to_string(),
        conversation_id: conversation_id.to_string(),
        attachments: Vec::new(),
        possibly_sensitive: false,
        annotations: Annotations::default(),
    }
}

pub fn media(key: &str, url: Option<&str>, alt: Option<&str>) -> MediaItem {
    MediaItem {
        media_key: key.to_string(),
        source_url: url.map(ToString::to_string),
        alt_text: alt.map(ToString::to_string),
    }
}

/// Source serving a fixed newest-first timeline, filtered by `since_id`.
#[derive(Default)]
pub struct FakeSource {
    pub timeline: Mutex<Timeline>,
    pub profile: Mutex<Option<Profile>>,
    /// Per-URL artificial latency for downloads.
    pub delays: HashMap<String, Duration>,
    pub fail_fetch: bool,
    pub fetch_calls: Mutex<Vec<Option<String>>>,
    pub downloads: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn with_timeline(posts: Vec<Post>, media: Vec<MediaItem>) -> Self {
        Self {
            timeline: Mutex::new(Timeline { posts, media }),
            ..Self::default()
        }
    }

    pub fn with_profile(profile: Profile) -> Self {
        Self {
            profile: Mutex::new(Some(profile)),
            ..Self::default()
        }
    }
}

#[async_trait]
impl SourceFetcher for FakeSource {
    async fn fetch_posts(&self, since_id: Option<&str>) -> Result<Timeline> {
        self.fetch_calls
            .lock()
            .unwrap()
            .push(since_id.map(ToString::to_string));
        if self.fail_fetch {
            bail!("source unavailable");
        }

        let timeline = self.timeline.lock().unwrap().clone();
        let since: u64 = since_id.map_or(0, |id| id.parse().unwrap());
        let posts = timeline
            .posts
            .into_iter()
            .filter(|p| p.id.parse::<u64>().unwrap() > since)
            .collect();
        Ok(Timeline {
            posts,
            media: timeline.media,
        })
    }

    async fn fetch_profile(&self) -> Result<Profile> {
        match self.profile.lock().unwrap().clone() {
            Some(profile) => Ok(profile),
            None => bail!("profile unavailable"),
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        self.downloads.lock().unwrap().push(url.to_string());
        if url.contains("broken") {
            bail!("404 for {url}");
        }
        Ok(url.as_bytes().to_vec())
    }
}

/// Destination recording every call. Status ids are `status-<n>`; media ids
/// are `media:<downloaded bytes>` so tests can tell uploads apart.
#[derive(Default)]
pub struct FakeDestination {
    pub statuses: Mutex<Vec<(String, NewStatus)>>,
    pub uploads: Mutex<Vec<(String, Option<String>)>>,
    pub pins: Mutex<Vec<String>>,
    pub profile_updates: Mutex<Vec<ProfileUpdate>>,
    /// Reject any status whose text contains this marker.
    pub reject_text: Option<String>,
    pub reject_pins: bool,
    next_id: AtomicU64,
}

impl FakeDestination {
    /// Destination that rejects any status whose text contains `marker`.
    pub fn rejecting_text(marker: &str) -> Self {
        Self {
            reject_text: Some(marker.to_string()),
            ..Self::default()
        }
    }

    pub fn rejecting_pins() -> Self {
        Self {
            reject_pins: true,
            ..Self::default()
        }
    }

    pub fn published(&self) -> Vec<(String, NewStatus)> {
        self.statuses.lock().unwrap().clone()
    }
}

#[async_trait]
impl DestinationPublisher for FakeDestination {
    async fn publish_status(&self, status: &NewStatus) -> Result<String> {
        if let Some(marker) = &self.reject_text {
            if status.text.contains(marker.as_str()) {
                bail!("422 Unprocessable Entity");
            }
        }
        let id = format!("status-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.statuses
            .lock()
            .unwrap()
            .push((id.clone(), status.clone()));
        Ok(id)
    }

    async fn upload_media(&self, bytes: Vec<u8>, alt_text: Option<&str>) -> Result<String> {
        let id = format!("media:{}", String::from_utf8(bytes).unwrap());
        self.uploads
            .lock()
            .unwrap()
            .push((id.clone(), alt_text.map(ToString::to_string)));
        Ok(id)
    }

    async fn pin_status(&self, status_id: &str) -> Result<()> {
        if self.reject_pins {
            bail!("422 already pinned");
        }
        self.pins.lock().unwrap().push(status_id.to_string());
        Ok(())
    }

    async fn update_profile(&self, update: ProfileUpdate) -> Result<()> {
        self.profile_updates.lock().unwrap().push(update);
        Ok(())
    }
}

/// Store that can be told to fail, backed by a [`MemoryStore`].
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    /// Fail reads of keys starting with this prefix; `""` fails every read.
    pub fail_get_prefix: Option<&'static str>,
    pub fail_put: bool,
    pub fail_purge: bool,
    pub purge_calls: AtomicUsize,
}

#[async_trait]
impl MirrorStore for FaultyStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_get_prefix.is_some_and(|prefix| key.starts_with(prefix)) {
            bail!("database is locked");
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        if self.fail_put {
            bail!("disk full");
        }
        self.inner.put(key, value, ttl).await
    }

    async fn purge_expired(&self) -> Result<u64> {
        self.purge_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_purge {
            bail!("disk I/O error");
        }
        self.inner.purge_expired().await
    }
}

pub struct Harness<S = MemoryStore> {
    pub source: Arc<FakeSource>,
    pub destination: Arc<FakeDestination>,
    pub store: Arc<S>,
    pub ctx: MirrorContext,
}

pub fn harness(source: FakeSource, destination: FakeDestination) -> Harness {
    harness_with_store(source, destination, MemoryStore::new())
}

pub fn harness_with_store<S: MirrorStore + 'static>(
    source: FakeSource,
    destination: FakeDestination,
    store: S,
) -> Harness<S> {
    let source = Arc::new(source);
    let destination = Arc::new(destination);
    let store = Arc::new(store);
    let ctx = MirrorContext::new(source.clone(), destination.clone(), store.clone());
    Harness {
        source,
        destination,
        store,
        ctx,
    }
}
