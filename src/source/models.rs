//! Source-side data model, validated out of the raw API payloads.

/// A URL annotation over a post's text. Offsets are code point offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlAnnotation {
    pub start: usize,
    pub end: usize,
    /// The shortened link as it appears in the text.
    pub short_url: String,
    /// The link target. Absent when the source could not resolve it.
    pub expanded_url: Option<String>,
    /// Set when the link points at media attached to the same post.
    pub media_key: Option<String>,
}

/// An `@username` mention over a post's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionAnnotation {
    pub start: usize,
    pub end: usize,
    pub username: String,
}

/// Annotation lists for one piece of text, each sorted by start offset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    pub urls: Vec<UrlAnnotation>,
    pub mentions: Vec<MentionAnnotation>,
}

impl Annotations {
    /// Build from unsorted lists, sorting each by start offset.
    #[must_use]
    pub fn sorted(mut urls: Vec<UrlAnnotation>, mut mentions: Vec<MentionAnnotation>) -> Self {
        urls.sort_by_key(|u| u.start);
        mentions.sort_by_key(|m| m.start);
        Self { urls, mentions }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub text: String,
    pub conversation_id: String,
    /// Media keys attached to this post, in attachment order.
    pub attachments: Vec<String>,
    pub possibly_sensitive: bool,
    pub annotations: Annotations,
}

impl Post {
    /// A post is a conversation root when it starts its own conversation.
    #[must_use]
    pub fn is_conversation_root(&self) -> bool {
        self.conversation_id == self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub media_key: String,
    /// Direct download URL. Videos and GIFs only carry a preview, so this is optional.
    pub source_url: Option<String>,
    pub alt_text: Option<String>,
}

/// One page of an account's timeline.
///
/// `posts` is newest-first, as the source returns it. `media` is the catalog
/// of expanded attachments and may not cover every attachment key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    pub posts: Vec<Post>,
    pub media: Vec<MediaItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub display_name: String,
    pub username: String,
    pub description: String,
    pub description_annotations: Annotations,
    pub avatar_url: Option<String>,
    pub pinned_post_id: Option<String>,
}
