//! Twitter API v2 client.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::models::{
    Annotations, MediaItem, MentionAnnotation, Post, Profile, Timeline, UrlAnnotation,
};
use super::SourceFetcher;
use crate::config::Config;
use crate::constants::USER_AGENT;

/// Largest page the user timeline endpoint serves.
const MAX_RESULTS: &str = "100";

/// The timeline endpoint only reaches back 3200 posts, i.e. 32 full pages.
const MAX_PAGES: usize = 32;

#[derive(Debug, Deserialize)]
struct ApiError {
    title: Option<String>,
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    #[serde(default)]
    result_count: u64,
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TimelineResponse {
    data: Option<Vec<RawTweet>>,
    includes: Option<Includes>,
    #[serde(default)]
    errors: Vec<ApiError>,
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
struct RawTweet {
    id: String,
    text: String,
    conversation_id: Option<String>,
    #[serde(default)]
    possibly_sensitive: bool,
    entities: Option<RawEntities>,
    attachments: Option<RawAttachments>,
}

#[derive(Debug, Default, Deserialize)]
struct RawEntities {
    #[serde(default)]
    urls: Vec<RawUrl>,
    #[serde(default)]
    mentions: Vec<RawMention>,
}

#[derive(Debug, Deserialize)]
struct RawUrl {
    start: usize,
    end: usize,
    url: String,
    expanded_url: Option<String>,
    media_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMention {
    start: usize,
    end: usize,
    username: String,
}

#[derive(Debug, Deserialize)]
struct RawAttachments {
    #[serde(default)]
    media_keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Includes {
    #[serde(default)]
    media: Vec<RawMedia>,
}

#[derive(Debug, Deserialize)]
struct RawMedia {
    media_key: String,
    url: Option<String>,
    alt_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    data: Option<RawUser>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    name: String,
    username: String,
    #[serde(default)]
    description: String,
    profile_image_url: Option<String>,
    pinned_tweet_id: Option<String>,
    entities: Option<RawUserEntities>,
}

#[derive(Debug, Deserialize)]
struct RawUserEntities {
    description: Option<RawEntities>,
}

/// What a v2 response body carried, once checked.
#[derive(Debug)]
enum Outcome<T> {
    Data(T),
    Empty,
    Failed(Vec<ApiError>),
}

impl<T> Outcome<T> {
    fn classify(data: Option<T>, errors: Vec<ApiError>) -> Self {
        match (data, errors.is_empty()) {
            (Some(data), _) => Self::Data(data),
            (None, true) => Self::Empty,
            (None, false) => Self::Failed(errors),
        }
    }
}

fn describe_errors(errors: &[ApiError]) -> String {
    errors
        .iter()
        .map(|e| match (&e.title, &e.detail) {
            (Some(title), Some(detail)) => format!("{title}: {detail}"),
            (Some(msg), None) | (None, Some(msg)) => msg.clone(),
            (None, None) => "unknown error".to_string(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

impl RawEntities {
    fn into_annotations(self) -> Annotations {
        let urls = self
            .urls
            .into_iter()
            .map(|u| UrlAnnotation {
                start: u.start,
                end: u.end,
                short_url: u.url,
                expanded_url: u.expanded_url,
                media_key: u.media_key,
            })
            .collect();
        let mentions = self
            .mentions
            .into_iter()
            .map(|m| MentionAnnotation {
                start: m.start,
                end: m.end,
                username: m.username,
            })
            .collect();
        Annotations::sorted(urls, mentions)
    }
}

impl RawTweet {
    fn into_post(self) -> Post {
        // Older payloads omit conversation_id on posts that start a thread.
        let conversation_id = self.conversation_id.unwrap_or_else(|| self.id.clone());
        Post {
            conversation_id,
            id: self.id,
            text: self.text,
            attachments: self.attachments.map(|a| a.media_keys).unwrap_or_default(),
            possibly_sensitive: self.possibly_sensitive,
            annotations: self.entities.unwrap_or_default().into_annotations(),
        }
    }
}

impl RawMedia {
    fn into_media_item(self) -> MediaItem {
        MediaItem {
            media_key: self.media_key,
            source_url: self.url,
            alt_text: self.alt_text.filter(|alt| !alt.is_empty()),
        }
    }
}

/// Client for one account's timeline and profile.
#[derive(Clone)]
pub struct TwitterClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
    user_id: String,
}

impl TwitterClient {
    /// Create a client for the configured account.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            api_url: config.twitter_api_url.trim_end_matches('/').to_string(),
            token: config.twitter_token.clone(),
            user_id: config.twitter_user_id.clone(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to reach Twitter API: {url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            bail!("Twitter API request failed: {status} - {body}");
        }

        response
            .json()
            .await
            .context("Failed to parse Twitter API response")
    }
}

#[async_trait]
impl SourceFetcher for TwitterClient {
    async fn fetch_posts(&self, since_id: Option<&str>) -> Result<Timeline> {
        let url = format!("{}/users/{}/tweets", self.api_url, self.user_id);
        let mut posts = Vec::new();
        let mut media = Vec::new();
        let mut pagination_token: Option<String> = None;

        for page in 1..=MAX_PAGES {
            let token = pagination_token.take();
            let mut query = vec![
                ("exclude", "replies"),
                ("max_results", MAX_RESULTS),
                ("expansions", "attachments.media_keys"),
                ("media.fields", "url,alt_text"),
                (
                    "tweet.fields",
                    "conversation_id,possibly_sensitive,entities,attachments",
                ),
            ];
            if let Some(since_id) = since_id {
                query.push(("since_id", since_id));
            }
            if let Some(token) = token.as_deref() {
                query.push(("pagination_token", token));
            }

            debug!(user_id = %self.user_id, since_id = ?since_id, page, "Fetching timeline");
            let response: TimelineResponse = self.get_json(&url, &query).await?;
            let meta = response.meta;

            match Outcome::classify(response.data, response.errors) {
                Outcome::Data(tweets) => {
                    posts.extend(tweets.into_iter().map(RawTweet::into_post));
                }
                Outcome::Empty => {}
                Outcome::Failed(errors) => {
                    bail!("Twitter timeline returned errors: {}", describe_errors(&errors))
                }
            }
            if let Some(includes) = response.includes {
                media.extend(includes.media.into_iter().map(RawMedia::into_media_item));
            }

            let result_count = meta.as_ref().map_or(0, |m| m.result_count);
            debug!(page, result_count, "Loaded timeline page");
            pagination_token = meta.and_then(|m| m.next_token);
            if pagination_token.is_none() {
                break;
            }
        }

        if pagination_token.is_some() {
            warn!(
                pages = MAX_PAGES,
                "Timeline has more pages than the API serves, older posts are skipped"
            );
        }

        info!(posts = posts.len(), "Loaded timeline");
        Ok(Timeline { posts, media })
    }

    async fn fetch_profile(&self) -> Result<Profile> {
        let url = format!("{}/users/{}", self.api_url, self.user_id);
        let query = [(
            "user.fields",
            "name,username,description,entities,profile_image_url,pinned_tweet_id",
        )];

        let response: UserResponse = self.get_json(&url, &query).await?;
        let user = match Outcome::classify(response.data, response.errors) {
            Outcome::Data(user) => user,
            Outcome::Empty => bail!("Twitter user {} not found", self.user_id),
            Outcome::Failed(errors) => {
                bail!("Twitter user lookup returned errors: {}", describe_errors(&errors))
            }
        };

        debug!(username = %user.username, "Loaded profile");
        Ok(Profile {
            display_name: user.name,
            username: user.username,
            description: user.description,
            description_annotations: user
                .entities
                .and_then(|e| e.description)
                .unwrap_or_default()
                .into_annotations(),
            avatar_url: user.profile_image_url,
            pinned_post_id: user.pinned_tweet_id,
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to download {url}"))?
            .error_for_status()
            .with_context(|| format!("Download of {url} returned error"))?
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {url}"))?;

        debug!(url = %url, bytes = bytes.len(), "Downloaded media");
        Ok(bytes.to_vec())
    }
}

impl std::fmt::Debug for TwitterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterClient")
            .field("api_url", &self.api_url)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}
