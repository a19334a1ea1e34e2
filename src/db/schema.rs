// Database schema — table creation and migrations.
//
// We use a simple version-based migration approach: a `schema_version` table
// tracks which migrations have run, and each migration is a function that
// executes SQL statements.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet.
///
/// This is idempotent — safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Tracks schema version for future migrations
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- One row per alert recipient (a Telegram chat)
        CREATE TABLE IF NOT EXISTS subscribers (
            chat_id INTEGER PRIMARY KEY,
            display_name TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Which subscriber watches which source
        CREATE TABLE IF NOT EXISTS subscriptions (
            chat_id INTEGER NOT NULL,
            source_handle TEXT NOT NULL,      -- normalized: no '@', lowercase
            upstream_id TEXT,                 -- opaque upstream account id, if known
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (chat_id, source_handle)
        );

        -- Per-subscriber keyword filters
        CREATE TABLE IF NOT EXISTS keywords (
            chat_id INTEGER NOT NULL,
            pattern TEXT NOT NULL,
            is_case_sensitive INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (chat_id, pattern)
        );

        -- Per-subscriber alert settings (defaults applied lazily on first access)
        CREATE TABLE IF NOT EXISTS settings (
            chat_id INTEGER PRIMARY KEY,
            alert_reposts INTEGER NOT NULL DEFAULT 1,
            alert_quotes INTEGER NOT NULL DEFAULT 1,
            alert_replies INTEGER NOT NULL DEFAULT 1,
            keywords_only INTEGER NOT NULL DEFAULT 0,
            is_paused INTEGER NOT NULL DEFAULT 0,
            telegram_enabled INTEGER NOT NULL DEFAULT 1
        );

        -- Global per-source ingestion cursor, shared by all watchers.
        -- Never regresses: advance_cursor only raises last_item_id.
        CREATE TABLE IF NOT EXISTS source_cursors (
            source_handle TEXT PRIMARY KEY,
            last_item_id TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Dedup log: a row here means the item was already delivered
        -- to that subscriber. Append-only, pruned by age.
        CREATE TABLE IF NOT EXISTS delivery_log (
            chat_id INTEGER NOT NULL,
            item_id TEXT NOT NULL,
            sent_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (chat_id, item_id)
        );

        -- Index for finding all watchers of one source per cycle
        CREATE INDEX IF NOT EXISTS idx_subscriptions_source
            ON subscriptions(source_handle);

        -- Index for age-based pruning of the delivery log
        CREATE INDEX IF NOT EXISTS idx_delivery_sent
            ON delivery_log(sent_at);
        ",
    )
    .context("Failed to create database tables")?;

    // Record initial schema version if not already set
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    // Migration v2: add seed_cursor column to subscriptions.
    // Holds the global cursor at subscription time so a new watcher of an
    // already-tracked source can opt out of items older than its join point.
    run_migration(conn, 2, |c| {
        c.execute_batch("ALTER TABLE subscriptions ADD COLUMN seed_cursor TEXT;")
    })?;

    Ok(())
}

/// Run a migration if it hasn't been applied yet.
/// The migration function receives the connection and should execute its SQL.
fn run_migration<F>(conn: &Connection, version: i64, migrate: F) -> Result<()>
where
    F: FnOnce(&Connection) -> rusqlite::Result<()>,
{
    let already_applied: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM schema_version WHERE version = ?1",
        [version],
        |row| row.get(0),
    )?;

    if !already_applied {
        migrate(conn).with_context(|| format!("Migration v{version} failed"))?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
    }

    Ok(())
}

/// Count the number of tables in the database (useful for init confirmation).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
