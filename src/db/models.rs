// Data models — Rust structs that map to database rows.
//
// These are the types that flow through the application. They're separate
// from the database queries so other modules can use them without depending
// on rusqlite directly.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One subscriber's interest in one source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub chat_id: i64,
    pub source_handle: String,
    /// Opaque upstream account id, when the backend exposes one.
    pub upstream_id: Option<String>,
    /// Global cursor at subscription time; items at or below it are not
    /// delivered to this subscriber even if still in the fetch window.
    pub seed_cursor: Option<String>,
    pub created_at: String,
}

/// A per-subscriber keyword filter. Matching is substring containment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyword {
    pub pattern: String,
    pub case_sensitive: bool,
}

/// Per-subscriber alert settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub alert_reposts: bool,
    pub alert_quotes: bool,
    pub alert_replies: bool,
    /// When true, only items matching at least one keyword are delivered.
    pub keywords_only: bool,
    pub paused: bool,
    pub telegram_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            alert_reposts: true,
            alert_quotes: true,
            alert_replies: true,
            keywords_only: false,
            paused: false,
            telegram_enabled: true,
        }
    }
}

/// Closed enumeration of setting names.
///
/// The front-end passes free-text names; parsing through this enum rejects
/// unknown names as a configuration error instead of interpolating strings
/// into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingName {
    AlertReposts,
    AlertQuotes,
    AlertReplies,
    KeywordsOnly,
    Paused,
    TelegramEnabled,
}

impl SettingName {
    pub const ALL: [SettingName; 6] = [
        SettingName::AlertReposts,
        SettingName::AlertQuotes,
        SettingName::AlertReplies,
        SettingName::KeywordsOnly,
        SettingName::Paused,
        SettingName::TelegramEnabled,
    ];

    /// The column this setting maps to. Also its user-facing name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingName::AlertReposts => "alert_reposts",
            SettingName::AlertQuotes => "alert_quotes",
            SettingName::AlertReplies => "alert_replies",
            SettingName::KeywordsOnly => "keywords_only",
            SettingName::Paused => "is_paused",
            SettingName::TelegramEnabled => "telegram_enabled",
        }
    }

    /// Read this setting's current value out of a `Settings` struct.
    pub fn get(&self, settings: &Settings) -> bool {
        match self {
            SettingName::AlertReposts => settings.alert_reposts,
            SettingName::AlertQuotes => settings.alert_quotes,
            SettingName::AlertReplies => settings.alert_replies,
            SettingName::KeywordsOnly => settings.keywords_only,
            SettingName::Paused => settings.paused,
            SettingName::TelegramEnabled => settings.telegram_enabled,
        }
    }
}

impl FromStr for SettingName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "alert_reposts" | "reposts" | "retweets" => Ok(SettingName::AlertReposts),
            "alert_quotes" | "quotes" => Ok(SettingName::AlertQuotes),
            "alert_replies" | "replies" => Ok(SettingName::AlertReplies),
            "keywords_only" => Ok(SettingName::KeywordsOnly),
            "is_paused" | "paused" => Ok(SettingName::Paused),
            "telegram_enabled" | "telegram" => Ok(SettingName::TelegramEnabled),
            other => anyhow::bail!(
                "Unknown setting '{other}'. Valid settings: reposts, quotes, replies, \
                 keywords_only, paused, telegram"
            ),
        }
    }
}

impl std::fmt::Display for SettingName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One active watcher of a source, with its settings and seed cursor.
/// Produced by the `watchers_of` join once per source per cycle.
#[derive(Debug, Clone)]
pub struct Watcher {
    pub chat_id: i64,
    pub settings: Settings,
    pub seed_cursor: Option<String>,
}

/// Aggregate counts for the `status` command.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub subscribers: i64,
    pub subscriptions: i64,
    pub sources: i64,
    pub keywords: i64,
    pub deliveries: i64,
}
