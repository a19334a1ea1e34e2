// Fetch layer — turns an upstream timeline into ordered `Item`s.
//
// The concrete backend (`RssTimelineFetcher`) reads public mirror RSS feeds.
// Everything above it only sees the `SourceFetcher` trait, so alternate
// backends (API client, scraper) slot in without touching the pipeline.

pub mod endpoints;
pub mod rss;
pub mod traits;

use chrono::{DateTime, Utc};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Classification of a fetched post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Original,
    Repost,
    Quote,
    Reply,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Original => "original",
            ItemKind::Repost => "repost",
            ItemKind::Quote => "quote",
            ItemKind::Reply => "reply",
        }
    }

    /// Emoji + label used when rendering alerts.
    pub fn badge(&self) -> (&'static str, &'static str) {
        match self {
            ItemKind::Original => ("\u{1F426}", "Post"),
            ItemKind::Repost => ("\u{1F501}", "Repost"),
            ItemKind::Quote => ("\u{1F4AC}", "Quote"),
            ItemKind::Reply => ("\u{21A9}\u{FE0F}", "Reply"),
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One fetched post. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Item {
    /// Upstream id — numeric for real posts, orderable as u64 when possible.
    pub id: String,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
    pub kind: ItemKind,
    /// Handle of the watched account this item came from.
    pub author: String,
    /// Canonical link to the post on the upstream site.
    pub link: String,
    /// Handles mentioned in the text, without the leading '@'.
    pub mentions: Vec<String>,
}

/// Compare two item ids for cursor advancement.
///
/// Ids compare numerically when both parse as u64 (the normal case);
/// otherwise lexicographically, so the cursor still never regresses
/// for odd feeds with non-numeric guids.
pub fn id_newer(candidate: &str, reference: &str) -> bool {
    match (candidate.parse::<u64>(), reference.parse::<u64>()) {
        (Ok(a), Ok(b)) => a > b,
        _ => candidate > reference,
    }
}

/// Since-filter policy for fetch results: strictly newer when both ids are
/// numeric, included when either side isn't (fail-open — better a duplicate
/// check than a silently dropped post; dedup catches re-delivery downstream).
pub fn passes_since(id: &str, since: &str) -> bool {
    match (id.parse::<u64>(), since.parse::<u64>()) {
        (Ok(a), Ok(b)) => a > b,
        _ => true,
    }
}

/// Detect the item kind from feed title and body text.
///
/// Mirror RSS feeds don't carry structured reference metadata, so this
/// relies on the textual markers the mirrors emit.
pub fn classify(title: &str, text: &str) -> ItemKind {
    if text.starts_with("RT @") || text.contains("RT by @") || title.starts_with("RT by ") {
        ItemKind::Repost
    } else if text.starts_with("R to @") || title.starts_with("R to ") {
        ItemKind::Reply
    } else if title.contains("quoted") {
        ItemKind::Quote
    } else {
        ItemKind::Original
    }
}

/// Extract @mentions from post text, without the '@'.
pub fn extract_mentions(text: &str) -> Vec<String> {
    // regex-lite has no compile-time cache; the pattern is trivially valid.
    let re = Regex::new(r"@(\w+)").unwrap();
    re.captures_iter(text)
        .map(|c| c[1].to_string())
        .collect()
}

/// Strip HTML tags from mirror feed content.
pub fn strip_html(text: &str) -> String {
    let re = Regex::new(r"<[^>]*>").unwrap();
    re.replace_all(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_newer_numeric() {
        assert!(id_newer("103", "100"));
        assert!(!id_newer("100", "103"));
        assert!(!id_newer("100", "100"));
        // Numeric comparison, not string comparison
        assert!(id_newer("1000", "999"));
    }

    #[test]
    fn test_id_newer_lexicographic_fallback() {
        assert!(id_newer("guid-b", "guid-a"));
        assert!(!id_newer("guid-a", "guid-b"));
    }

    #[test]
    fn test_passes_since_fail_open() {
        assert!(passes_since("101", "100"));
        assert!(!passes_since("100", "100"));
        // Non-numeric ids are included rather than dropped
        assert!(passes_since("guid-abc", "100"));
        assert!(passes_since("101", "guid-abc"));
    }

    #[test]
    fn test_classify_markers() {
        assert_eq!(classify("", "RT @someone: hello"), ItemKind::Repost);
        assert_eq!(classify("RT by @watcher", "hello"), ItemKind::Repost);
        assert_eq!(classify("", "R to @someone: sure"), ItemKind::Reply);
        assert_eq!(classify("someone quoted a post", "look"), ItemKind::Quote);
        assert_eq!(classify("", "just a post"), ItemKind::Original);
    }

    #[test]
    fn test_extract_mentions() {
        assert_eq!(
            extract_mentions("hey @alice and @bob_2, not bare-at @"),
            vec!["alice".to_string(), "bob_2".to_string()]
        );
        assert!(extract_mentions("no mentions here").is_empty());
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>hello <b>world</b></p>"), "hello world");
        assert_eq!(strip_html("  plain  "), "plain");
    }
}
