//! Rewriting of annotated source text into plain destination text.
//!
//! The source network returns post text with shortened links, `@mentions`
//! and HTML entity escapes. [`expand`] replaces annotated ranges in a single
//! forward pass and [`unescape`] undoes the entity escaping.

use tracing::debug;

use crate::constants::SOURCE_PROFILE_BASE;
use crate::source::{MentionAnnotation, UrlAnnotation};

/// Canonical profile URL for a source username.
#[must_use]
pub fn canonical_profile_url(username: &str) -> String {
    format!("{SOURCE_PROFILE_BASE}{username}")
}

enum Edit<'a> {
    Mention(&'a MentionAnnotation),
    Url(&'a UrlAnnotation),
}

impl Edit<'_> {
    fn range(&self) -> (usize, usize) {
        match self {
            Self::Mention(m) => (m.start, m.end),
            Self::Url(u) => (u.start, u.end),
        }
    }

    fn replacement(&self, attached_media: &[String]) -> String {
        match self {
            Self::Mention(m) => canonical_profile_url(&m.username),
            Self::Url(u) => {
                // The media itself gets attached, so its link would be redundant.
                let is_attached = u
                    .media_key
                    .as_ref()
                    .is_some_and(|key| attached_media.contains(key));
                if is_attached {
                    String::new()
                } else {
                    u.expanded_url.clone().unwrap_or_else(|| u.short_url.clone())
                }
            }
        }
    }
}

/// Forward-only cursor over a string, addressed by code point offset.
struct CharCursor<'a> {
    text: &'a str,
    byte: usize,
    chars: usize,
}

impl<'a> CharCursor<'a> {
    const fn new(text: &'a str) -> Self {
        Self {
            text,
            byte: 0,
            chars: 0,
        }
    }

    /// Advance to code point `target`, returning the text passed over.
    fn take_to(&mut self, target: usize) -> &'a str {
        let from = self.byte;
        for c in self.text[from..].chars().take(target - self.chars) {
            self.byte += c.len_utf8();
        }
        self.chars = target;
        &self.text[from..self.byte]
    }

    fn rest(&self) -> &'a str {
        &self.text[self.byte..]
    }
}

/// Replace the annotated ranges of `text`.
///
/// URL annotations become their expanded URL, or vanish when they point at
/// one of `attached_media`. Mentions become the mentioned account's profile
/// URL. Both lists are merged by start offset; on equal starts the mention is
/// applied first. Annotations that overlap an earlier one or fall outside the
/// text are left unapplied.
#[must_use]
pub fn expand(
    text: &str,
    urls: &[UrlAnnotation],
    mentions: &[MentionAnnotation],
    attached_media: &[String],
) -> String {
    let mut urls: Vec<&UrlAnnotation> = urls.iter().collect();
    urls.sort_by_key(|u| u.start);
    let mut mentions: Vec<&MentionAnnotation> = mentions.iter().collect();
    mentions.sort_by_key(|m| m.start);

    let total_chars = text.chars().count();
    let mut urls = urls.into_iter().peekable();
    let mut mentions = mentions.into_iter().peekable();
    let mut cursor = CharCursor::new(text);
    let mut out = String::with_capacity(text.len());

    loop {
        let take_mention = match (mentions.peek(), urls.peek()) {
            (Some(m), Some(u)) => m.start <= u.start,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        let edit = if take_mention {
            mentions.next().map(Edit::Mention)
        } else {
            urls.next().map(Edit::Url)
        };
        let Some(edit) = edit else { break };

        let (start, end) = edit.range();
        if start < cursor.chars || end < start || end > total_chars {
            debug!(start, end, consumed = cursor.chars, "Skipping out-of-range annotation");
            continue;
        }

        out.push_str(cursor.take_to(start));
        cursor.take_to(end);
        out.push_str(&edit.replacement(attached_media));
    }

    out.push_str(cursor.rest());
    out
}

/// Undo the HTML entity escaping the source applies to text.
#[must_use]
pub fn unescape(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}
