//! Shared constants used across the application.

use std::time::Duration;

/// User agent sent with every outbound HTTP request.
pub const USER_AGENT: &str = concat!("tweet-mirror/", env!("CARGO_PKG_VERSION"));

/// Base of a canonical source profile URL. A username is appended directly.
pub const SOURCE_PROFILE_BASE: &str = "https://twitter.com/";

/// How long a post mapping stays resolvable for reply threading and pinning.
pub const MIRROR_RECORD_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7);

/// Size marker the source embeds in avatar URLs to serve a 48x48 thumbnail.
pub const AVATAR_SIZE_MARKER: &str = "_normal";
