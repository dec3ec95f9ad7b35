use thiserror::Error;

/// Why a sync cycle stopped.
///
/// A missing reply parent or pinned-post mapping is not an error; the cycle
/// degrades to publishing without a reply target or skipping the pin.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The source was unreachable or rejected the request. Nothing was written.
    #[error("failed to fetch from source: {0:#}")]
    Fetch(anyhow::Error),
    /// The destination rejected a status, media upload or profile update.
    #[error("failed to publish to destination: {0:#}")]
    Publish(anyhow::Error),
    /// The state store could not be read or written.
    #[error("state store error: {0:#}")]
    Store(anyhow::Error),
}
