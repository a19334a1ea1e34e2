// Filter engine — decides whether one item goes to one subscriber.
//
// `evaluate` is a pure function: no I/O, no mutation. The dispatcher calls
// it once per (item, watcher) pair, so everything here has to stay cheap
// and deterministic.

use crate::db::models::{Keyword, Settings};
use crate::fetch::{Item, ItemKind};

/// Why an item was sent or skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    Paused,
    RepostsDisabled,
    QuotesDisabled,
    RepliesDisabled,
    NoKeywordMatch,
    KeywordMatch,
    Unfiltered,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::Paused => "alerts paused",
            Reason::RepostsDisabled => "reposts disabled",
            Reason::QuotesDisabled => "quotes disabled",
            Reason::RepliesDisabled => "replies disabled",
            Reason::NoKeywordMatch => "no keyword match (keywords_only mode)",
            Reason::KeywordMatch => "matched keywords",
            Reason::Unfiltered => "all items mode",
        }
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The send/skip decision for one (item, subscriber) pair.
#[derive(Debug, Clone)]
pub struct Decision {
    pub send: bool,
    pub reason: Reason,
    /// Keywords that matched, in the subscriber's stored order.
    pub matched: Vec<String>,
}

impl Decision {
    fn skip(reason: Reason) -> Self {
        Self {
            send: false,
            reason,
            matched: Vec::new(),
        }
    }
}

/// Evaluate an item against one subscriber's settings and keywords.
///
/// Order matters: paused wins over everything, type gates come before the
/// keyword scan, and keyword matching ignores the type-gating outcome
/// (a gated repost never reaches the keyword step at all).
pub fn evaluate(item: &Item, settings: &Settings, keywords: &[Keyword]) -> Decision {
    if settings.paused {
        return Decision::skip(Reason::Paused);
    }

    match item.kind {
        ItemKind::Repost if !settings.alert_reposts => {
            return Decision::skip(Reason::RepostsDisabled)
        }
        ItemKind::Quote if !settings.alert_quotes => {
            return Decision::skip(Reason::QuotesDisabled)
        }
        ItemKind::Reply if !settings.alert_replies => {
            return Decision::skip(Reason::RepliesDisabled)
        }
        _ => {}
    }

    let matched = matching_keywords(&item.text, keywords);

    if settings.keywords_only && matched.is_empty() {
        return Decision::skip(Reason::NoKeywordMatch);
    }

    if matched.is_empty() {
        Decision {
            send: true,
            reason: Reason::Unfiltered,
            matched,
        }
    } else {
        Decision {
            send: true,
            reason: Reason::KeywordMatch,
            matched,
        }
    }
}

/// Containment scan: which keywords appear in the text?
///
/// Case sensitivity is per keyword. Substring match, not whole-word —
/// "mint" matches "minting".
pub fn matching_keywords(text: &str, keywords: &[Keyword]) -> Vec<String> {
    let lowered = text.to_lowercase();
    keywords
        .iter()
        .filter(|kw| {
            if kw.case_sensitive {
                text.contains(&kw.pattern)
            } else {
                lowered.contains(&kw.pattern.to_lowercase())
            }
        })
        .map(|kw| kw.pattern.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(kind: ItemKind, text: &str) -> Item {
        Item {
            id: "101".to_string(),
            text: text.to_string(),
            created_at: Some(Utc::now()),
            kind,
            author: "alice".to_string(),
            link: "https://twitter.com/alice/status/101".to_string(),
            mentions: Vec::new(),
        }
    }

    fn keyword(pattern: &str, case_sensitive: bool) -> Keyword {
        Keyword {
            pattern: pattern.to_string(),
            case_sensitive,
        }
    }

    #[test]
    fn test_paused_blocks_everything() {
        let settings = Settings {
            paused: true,
            ..Settings::default()
        };
        let decision = evaluate(&item(ItemKind::Original, "anything"), &settings, &[]);
        assert!(!decision.send);
        assert_eq!(decision.reason, Reason::Paused);
    }

    #[test]
    fn test_reply_gate() {
        let settings = Settings {
            alert_replies: false,
            ..Settings::default()
        };
        let decision = evaluate(&item(ItemKind::Reply, "R to @bob: yes"), &settings, &[]);
        assert!(!decision.send);
        assert_eq!(decision.reason, Reason::RepliesDisabled);
    }

    #[test]
    fn test_repost_and_quote_gates() {
        let settings = Settings {
            alert_reposts: false,
            alert_quotes: false,
            ..Settings::default()
        };
        assert!(!evaluate(&item(ItemKind::Repost, "RT @x"), &settings, &[]).send);
        assert!(!evaluate(&item(ItemKind::Quote, "look"), &settings, &[]).send);
        // Originals pass the gates untouched
        assert!(evaluate(&item(ItemKind::Original, "hi"), &settings, &[]).send);
    }

    #[test]
    fn test_keywords_only_without_match() {
        let settings = Settings {
            keywords_only: true,
            ..Settings::default()
        };
        let decision = evaluate(
            &item(ItemKind::Original, "text with nothing relevant"),
            &settings,
            &[keyword("mint", false)],
        );
        assert!(!decision.send);
        assert_eq!(decision.reason, Reason::NoKeywordMatch);
    }

    #[test]
    fn test_keywords_only_with_match() {
        let settings = Settings {
            keywords_only: true,
            ..Settings::default()
        };
        let decision = evaluate(
            &item(ItemKind::Original, "mint now"),
            &settings,
            &[keyword("mint", false)],
        );
        assert!(decision.send);
        assert_eq!(decision.reason, Reason::KeywordMatch);
        assert_eq!(decision.matched, vec!["mint".to_string()]);
    }

    #[test]
    fn test_defaults_send_quote_unfiltered() {
        let decision = evaluate(&item(ItemKind::Quote, "quoting something"), &Settings::default(), &[]);
        assert!(decision.send);
        assert_eq!(decision.reason, Reason::Unfiltered);
        assert!(decision.matched.is_empty());
    }

    #[test]
    fn test_case_sensitivity_per_keyword() {
        let keywords = vec![keyword("NFT", true), keyword("Drop", false)];
        let matched = matching_keywords("big drop today, nft later", &keywords);
        // "NFT" is case-sensitive and doesn't match "nft"; "Drop" folds
        assert_eq!(matched, vec!["Drop".to_string()]);

        let matched = matching_keywords("NFT drop", &keywords);
        assert_eq!(matched, vec!["NFT".to_string(), "Drop".to_string()]);
    }

    #[test]
    fn test_containment_not_whole_word() {
        let matched = matching_keywords("we are minting", &[keyword("mint", false)]);
        assert_eq!(matched, vec!["mint".to_string()]);
    }

    #[test]
    fn test_match_recorded_even_without_keywords_only() {
        // Keyword matching is independent of the keywords_only gate
        let decision = evaluate(
            &item(ItemKind::Original, "free giveaway inside"),
            &Settings::default(),
            &[keyword("giveaway", false)],
        );
        assert!(decision.send);
        assert_eq!(decision.reason, Reason::KeywordMatch);
        assert_eq!(decision.matched, vec!["giveaway".to_string()]);
    }
}
