//! Twitter to Mastodon mirror.
//!
//! Copies one account's public posts and profile from Twitter to Mastodon,
//! keeping reply threads, attachments, sensitivity flags and the pinned post.
//! Each run performs one bounded cycle; a small key/value store carries the
//! timeline cursor and post mappings between runs.

pub mod config;
pub mod constants;
pub mod destination;
pub mod error;
pub mod media;
pub mod rewrite;
pub mod source;
pub mod store;
pub mod sync;
pub mod web;

pub use error::SyncError;
