//! Sync cycles. Each trigger firing runs exactly one cycle to completion.

mod posts;
mod profile;

pub use posts::{PostSync, PostSyncReport};
pub use profile::{compose_bio, full_size_avatar_url, ProfileSync, ProfileSyncReport};

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::destination::{DestinationPublisher, MastodonClient};
use crate::error::SyncError;
use crate::source::{SourceFetcher, TwitterClient};
use crate::store::{MirrorStore, SqliteStore};

/// The collaborators a cycle runs against.
#[derive(Clone)]
pub struct MirrorContext {
    pub source: Arc<dyn SourceFetcher>,
    pub destination: Arc<dyn DestinationPublisher>,
    pub store: Arc<dyn MirrorStore>,
}

impl MirrorContext {
    #[must_use]
    pub fn new(
        source: Arc<dyn SourceFetcher>,
        destination: Arc<dyn DestinationPublisher>,
        store: Arc<dyn MirrorStore>,
    ) -> Self {
        Self {
            source,
            destination,
            store,
        }
    }

    /// Build the production clients and open the state database.
    ///
    /// # Errors
    ///
    /// Returns an error if a client cannot be built or the database cannot be opened.
    pub async fn from_config(config: &Config) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
        }

        let source = TwitterClient::new(config)?;
        let destination = MastodonClient::new(config)?;
        let store = SqliteStore::open(&config.database_path).await?;

        Ok(Self::new(
            Arc::new(source),
            Arc::new(destination),
            Arc::new(store),
        ))
    }
}

impl std::fmt::Debug for MirrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorContext").finish_non_exhaustive()
    }
}

/// Which cycle a trigger runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    PostSync,
    ProfileSync,
}

impl Cycle {
    /// Select the cycle for a schedule identity, if it is one of ours.
    #[must_use]
    pub fn from_schedule(schedule: &str, config: &Config) -> Option<Self> {
        if schedule == config.post_sync_schedule {
            Some(Self::PostSync)
        } else if schedule == config.profile_sync_schedule {
            Some(Self::ProfileSync)
        } else {
            None
        }
    }
}

/// Outcome of one completed cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "cycle", rename_all = "kebab-case")]
pub enum CycleReport {
    PostSync(PostSyncReport),
    ProfileSync(ProfileSyncReport),
}

/// Run one cycle against `ctx`.
///
/// # Errors
///
/// Returns the error that aborted the cycle.
pub async fn run_cycle(ctx: &MirrorContext, cycle: Cycle) -> Result<CycleReport, SyncError> {
    info!(cycle = ?cycle, "Starting cycle");
    let report = match cycle {
        Cycle::PostSync => CycleReport::PostSync(PostSync::new(ctx).run().await?),
        Cycle::ProfileSync => CycleReport::ProfileSync(ProfileSync::new(ctx).run().await?),
    };
    info!(cycle = ?cycle, "Cycle complete");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_from_schedule() {
        let config = Config::for_testing();
        assert_eq!(
            Cycle::from_schedule("*/5 * * * *", &config),
            Some(Cycle::PostSync)
        );
        assert_eq!(
            Cycle::from_schedule("0 0 * * *", &config),
            Some(Cycle::ProfileSync)
        );
        assert_eq!(Cycle::from_schedule("0 12 * * *", &config), None);
    }
}
