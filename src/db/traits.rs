// Database trait — backend-agnostic async interface for all DB operations.
//
// Implementor: SqliteDatabase (wraps rusqlite behind a tokio Mutex).
// All methods are async so a native-async backend could slot in later
// without touching callers, which hold `Arc<dyn Database>`.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{Keyword, SettingName, Settings, StoreStats, Subscription, Watcher};

#[async_trait]
pub trait Database: Send + Sync {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the database.
    async fn table_count(&self) -> Result<i64>;

    // --- Subscribers ---

    /// Create or refresh a subscriber row plus its default settings.
    async fn ensure_subscriber(&self, chat_id: i64, display_name: Option<&str>) -> Result<()>;

    // --- Subscriptions ---

    /// Add or refresh a subscription (insert-or-update on conflict).
    async fn upsert_subscription(
        &self,
        chat_id: i64,
        source_handle: &str,
        upstream_id: Option<&str>,
        seed_cursor: Option<&str>,
    ) -> Result<()>;

    /// Remove a subscription; returns false if it didn't exist.
    async fn remove_subscription(&self, chat_id: i64, source_handle: &str) -> Result<bool>;

    /// All subscriptions for one subscriber.
    async fn subscriptions_for(&self, chat_id: i64) -> Result<Vec<Subscription>>;

    /// Distinct watched source handles — one fetch each per poll cycle.
    async fn watched_sources(&self) -> Result<Vec<String>>;

    /// Active watchers of a source with their settings.
    async fn watchers_of(&self, source_handle: &str) -> Result<Vec<Watcher>>;

    // --- Keywords ---

    /// Add a keyword filter; returns false on duplicate.
    async fn add_keyword(&self, chat_id: i64, pattern: &str, case_sensitive: bool) -> Result<bool>;

    /// Remove a keyword; returns false if absent.
    async fn remove_keyword(&self, chat_id: i64, pattern: &str) -> Result<bool>;

    /// All keyword filters for one subscriber.
    async fn keywords_for(&self, chat_id: i64) -> Result<Vec<Keyword>>;

    // --- Settings ---

    /// Get settings, creating the default row on first access.
    async fn get_settings(&self, chat_id: i64) -> Result<Settings>;

    /// Set one setting flag by its closed enum name.
    async fn set_setting(&self, chat_id: i64, name: SettingName, value: bool) -> Result<()>;

    // --- Source cursors ---

    /// The global last-seen item id for a source.
    async fn get_cursor(&self, source_handle: &str) -> Result<Option<String>>;

    /// Raise the global cursor; never regresses.
    async fn advance_cursor(&self, source_handle: &str, item_id: &str) -> Result<()>;

    // --- Delivery log ---

    /// Has this (subscriber, item) pair already been delivered?
    async fn delivery_exists(&self, chat_id: i64, item_id: &str) -> Result<bool>;

    /// Record a delivery (insert-if-absent).
    async fn record_delivery(&self, chat_id: i64, item_id: &str) -> Result<()>;

    /// Delete delivery records older than `days`; returns the number pruned.
    async fn prune_deliveries(&self, days: i64) -> Result<usize>;

    // --- Stats ---

    /// Aggregate counts for status display.
    async fn stats(&self) -> Result<StoreStats>;
}
