use std::env;
use std::time::Duration;

use anyhow::Result;

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
pub struct Config {
    /// Telegram Bot API token — required for `run`, not for local admin commands.
    pub telegram_bot_token: String,
    pub db_path: String,
    /// How often the poll cycle wakes up.
    pub poll_interval: Duration,
    /// Pause between sources within a cycle, to respect upstream rate limits.
    pub source_delay: Duration,
    /// Max items requested per source per cycle.
    pub fetch_limit: usize,
    /// Delivery log entries older than this many days are pruned.
    pub retention_days: i64,
    /// Mirror endpoints for timeline fetches. Empty means use the built-in list.
    pub endpoints: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Only the Telegram token has no default — everything else falls back
    /// to values that work out of the box.
    pub fn load() -> Result<Self> {
        let poll_interval = env::var("KESTREL_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);

        let source_delay = env::var("KESTREL_SOURCE_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1000);

        let fetch_limit = env::var("KESTREL_FETCH_LIMIT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(10);

        let retention_days = env::var("KESTREL_RETENTION_DAYS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(7);

        // Comma-separated override, e.g. "https://mirror-a.example,https://mirror-b.example"
        let endpoints = env::var("KESTREL_ENDPOINTS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().trim_end_matches('/').to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default(),
            db_path: env::var("KESTREL_DB_PATH").unwrap_or_else(|_| "./kestrel.db".to_string()),
            poll_interval: Duration::from_secs(poll_interval),
            source_delay: Duration::from_millis(source_delay),
            fetch_limit,
            retention_days,
            endpoints,
        })
    }

    /// Check that the Telegram token is configured.
    /// Call this before starting the poller — alerts go nowhere without it.
    pub fn require_telegram(&self) -> Result<()> {
        if self.telegram_bot_token.is_empty() {
            anyhow::bail!(
                "TELEGRAM_BOT_TOKEN not set. Add it to your .env file.\n\
                 Get a token from @BotFather on Telegram."
            );
        }
        Ok(())
    }
}
