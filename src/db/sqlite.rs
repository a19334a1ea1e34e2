// SqliteDatabase — rusqlite backend implementing the Database trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Send.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// The lock is never held across .await points — Rust enforces this because
// MutexGuard is !Send.
//
// The free functions in queries.rs remain available so tests can work
// against a Connection directly.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::{Keyword, SettingName, Settings, StoreStats, Subscription, Watcher};
use super::traits::Database;

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn ensure_subscriber(&self, chat_id: i64, display_name: Option<&str>) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::ensure_subscriber(&conn, chat_id, display_name)
    }

    async fn upsert_subscription(
        &self,
        chat_id: i64,
        source_handle: &str,
        upstream_id: Option<&str>,
        seed_cursor: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::upsert_subscription(&conn, chat_id, source_handle, upstream_id, seed_cursor)
    }

    async fn remove_subscription(&self, chat_id: i64, source_handle: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        super::queries::remove_subscription(&conn, chat_id, source_handle)
    }

    async fn subscriptions_for(&self, chat_id: i64) -> Result<Vec<Subscription>> {
        let conn = self.conn.lock().await;
        super::queries::subscriptions_for(&conn, chat_id)
    }

    async fn watched_sources(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().await;
        super::queries::watched_sources(&conn)
    }

    async fn watchers_of(&self, source_handle: &str) -> Result<Vec<Watcher>> {
        let conn = self.conn.lock().await;
        super::queries::watchers_of(&conn, source_handle)
    }

    async fn add_keyword(&self, chat_id: i64, pattern: &str, case_sensitive: bool) -> Result<bool> {
        let conn = self.conn.lock().await;
        super::queries::add_keyword(&conn, chat_id, pattern, case_sensitive)
    }

    async fn remove_keyword(&self, chat_id: i64, pattern: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        super::queries::remove_keyword(&conn, chat_id, pattern)
    }

    async fn keywords_for(&self, chat_id: i64) -> Result<Vec<Keyword>> {
        let conn = self.conn.lock().await;
        super::queries::keywords_for(&conn, chat_id)
    }

    async fn get_settings(&self, chat_id: i64) -> Result<Settings> {
        let conn = self.conn.lock().await;
        super::queries::get_settings(&conn, chat_id)
    }

    async fn set_setting(&self, chat_id: i64, name: SettingName, value: bool) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::set_setting(&conn, chat_id, name, value)
    }

    async fn get_cursor(&self, source_handle: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        super::queries::get_cursor(&conn, source_handle)
    }

    async fn advance_cursor(&self, source_handle: &str, item_id: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::advance_cursor(&conn, source_handle, item_id)
    }

    async fn delivery_exists(&self, chat_id: i64, item_id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        super::queries::delivery_exists(&conn, chat_id, item_id)
    }

    async fn record_delivery(&self, chat_id: i64, item_id: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::record_delivery(&conn, chat_id, item_id)
    }

    async fn prune_deliveries(&self, days: i64) -> Result<usize> {
        let conn = self.conn.lock().await;
        super::queries::prune_deliveries(&conn, days)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn.lock().await;
        super::queries::stats(&conn)
    }
}
