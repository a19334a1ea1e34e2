// Database queries — CRUD operations for all tables.
//
// Every database interaction goes through this module. This keeps SQL
// contained in one place and gives the rest of the app clean Rust interfaces.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use super::models::{Keyword, SettingName, Settings, StoreStats, Subscription, Watcher};

// --- Subscribers ---

/// Create a subscriber row (upsert) and its default settings row.
pub fn ensure_subscriber(conn: &Connection, chat_id: i64, display_name: Option<&str>) -> Result<()> {
    conn.execute(
        "INSERT INTO subscribers (chat_id, display_name) VALUES (?1, ?2)
         ON CONFLICT(chat_id) DO UPDATE SET
            display_name = COALESCE(excluded.display_name, display_name),
            updated_at = datetime('now')",
        params![chat_id, display_name],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO settings (chat_id) VALUES (?1)",
        params![chat_id],
    )?;
    Ok(())
}

// --- Subscriptions ---

/// Add or refresh a subscription. Conflicts update the upstream id and seed
/// cursor rather than erroring, so re-adding a source is harmless.
pub fn upsert_subscription(
    conn: &Connection,
    chat_id: i64,
    source_handle: &str,
    upstream_id: Option<&str>,
    seed_cursor: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO subscriptions (chat_id, source_handle, upstream_id, seed_cursor)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(chat_id, source_handle) DO UPDATE SET
            upstream_id = COALESCE(excluded.upstream_id, upstream_id),
            seed_cursor = COALESCE(excluded.seed_cursor, seed_cursor)",
        params![chat_id, source_handle, upstream_id, seed_cursor],
    )?;
    Ok(())
}

/// Remove a subscription. Returns false if it didn't exist. The source's
/// global cursor is left alone — other watchers may still need it.
pub fn remove_subscription(conn: &Connection, chat_id: i64, source_handle: &str) -> Result<bool> {
    let changed = conn.execute(
        "DELETE FROM subscriptions WHERE chat_id = ?1 AND source_handle = ?2",
        params![chat_id, source_handle],
    )?;
    Ok(changed > 0)
}

/// All subscriptions for one subscriber, alphabetical by handle.
pub fn subscriptions_for(conn: &Connection, chat_id: i64) -> Result<Vec<Subscription>> {
    let mut stmt = conn.prepare(
        "SELECT chat_id, source_handle, upstream_id, seed_cursor, created_at
         FROM subscriptions WHERE chat_id = ?1 ORDER BY source_handle",
    )?;
    let rows = stmt.query_map(params![chat_id], |row| {
        Ok(Subscription {
            chat_id: row.get(0)?,
            source_handle: row.get(1)?,
            upstream_id: row.get(2)?,
            seed_cursor: row.get(3)?,
            created_at: row.get(4)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Distinct watched sources across all subscribers — the poll cycle's
/// work list. Each source is fetched once per cycle regardless of how
/// many subscribers watch it.
pub fn watched_sources(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT source_handle FROM subscriptions ORDER BY source_handle",
    )?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Active watchers of one source, with settings joined in.
///
/// Settings default lazily: a subscriber without a settings row yet gets
/// the defaults via the LEFT JOIN's NULL columns.
pub fn watchers_of(conn: &Connection, source_handle: &str) -> Result<Vec<Watcher>> {
    let defaults = Settings::default();
    let mut stmt = conn.prepare(
        "SELECT sub.chat_id, sub.seed_cursor,
                s.alert_reposts, s.alert_quotes, s.alert_replies,
                s.keywords_only, s.is_paused, s.telegram_enabled
         FROM subscriptions sub
         JOIN subscribers u ON u.chat_id = sub.chat_id
         LEFT JOIN settings s ON s.chat_id = sub.chat_id
         WHERE sub.source_handle = ?1 AND u.is_active = 1
         ORDER BY sub.chat_id",
    )?;
    let rows = stmt.query_map(params![source_handle], |row| {
        Ok(Watcher {
            chat_id: row.get(0)?,
            seed_cursor: row.get(1)?,
            settings: Settings {
                alert_reposts: flag(row.get(2)?, defaults.alert_reposts),
                alert_quotes: flag(row.get(3)?, defaults.alert_quotes),
                alert_replies: flag(row.get(4)?, defaults.alert_replies),
                keywords_only: flag(row.get(5)?, defaults.keywords_only),
                paused: flag(row.get(6)?, defaults.paused),
                telegram_enabled: flag(row.get(7)?, defaults.telegram_enabled),
            },
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn flag(value: Option<i64>, default: bool) -> bool {
    value.map(|v| v != 0).unwrap_or(default)
}

// --- Keywords ---

/// Add a keyword filter. Case-insensitive patterns are stored lowercased so
/// the match loop can compare without re-folding. Returns false on duplicate.
pub fn add_keyword(
    conn: &Connection,
    chat_id: i64,
    pattern: &str,
    case_sensitive: bool,
) -> Result<bool> {
    let stored = if case_sensitive {
        pattern.to_string()
    } else {
        pattern.to_lowercase()
    };
    let changed = conn.execute(
        "INSERT OR IGNORE INTO keywords (chat_id, pattern, is_case_sensitive)
         VALUES (?1, ?2, ?3)",
        params![chat_id, stored, case_sensitive],
    )?;
    Ok(changed > 0)
}

/// Remove a keyword (case-insensitive lookup). Returns false if absent.
pub fn remove_keyword(conn: &Connection, chat_id: i64, pattern: &str) -> Result<bool> {
    let changed = conn.execute(
        "DELETE FROM keywords WHERE chat_id = ?1 AND LOWER(pattern) = LOWER(?2)",
        params![chat_id, pattern],
    )?;
    Ok(changed > 0)
}

/// All keyword filters for one subscriber.
pub fn keywords_for(conn: &Connection, chat_id: i64) -> Result<Vec<Keyword>> {
    let mut stmt = conn.prepare(
        "SELECT pattern, is_case_sensitive FROM keywords WHERE chat_id = ?1 ORDER BY pattern",
    )?;
    let rows = stmt.query_map(params![chat_id], |row| {
        Ok(Keyword {
            pattern: row.get(0)?,
            case_sensitive: row.get::<_, i64>(1)? != 0,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

// --- Settings ---

/// Get a subscriber's settings, creating the default row on first access.
pub fn get_settings(conn: &Connection, chat_id: i64) -> Result<Settings> {
    let defaults = Settings::default();
    let read = |conn: &Connection| -> Result<Option<Settings>> {
        let mut stmt = conn.prepare(
            "SELECT alert_reposts, alert_quotes, alert_replies,
                    keywords_only, is_paused, telegram_enabled
             FROM settings WHERE chat_id = ?1",
        )?;
        let result = stmt
            .query_row(params![chat_id], |row| {
                Ok(Settings {
                    alert_reposts: row.get::<_, i64>(0)? != 0,
                    alert_quotes: row.get::<_, i64>(1)? != 0,
                    alert_replies: row.get::<_, i64>(2)? != 0,
                    keywords_only: row.get::<_, i64>(3)? != 0,
                    paused: row.get::<_, i64>(4)? != 0,
                    telegram_enabled: row.get::<_, i64>(5)? != 0,
                })
            })
            .optional()?;
        Ok(result)
    };

    if let Some(settings) = read(conn)? {
        return Ok(settings);
    }
    conn.execute(
        "INSERT OR IGNORE INTO settings (chat_id) VALUES (?1)",
        params![chat_id],
    )?;
    Ok(read(conn)?.unwrap_or(defaults))
}

/// Set one setting flag. The column name comes from the closed `SettingName`
/// enum, never from caller input.
pub fn set_setting(conn: &Connection, chat_id: i64, name: SettingName, value: bool) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO settings (chat_id) VALUES (?1)",
        params![chat_id],
    )?;
    let sql = format!("UPDATE settings SET {} = ?1 WHERE chat_id = ?2", name.as_str());
    conn.execute(&sql, params![value, chat_id])?;
    Ok(())
}

// --- Source cursors ---

/// The global "last seen" id for a source, if any items were ever processed.
pub fn get_cursor(conn: &Connection, source_handle: &str) -> Result<Option<String>> {
    let mut stmt =
        conn.prepare("SELECT last_item_id FROM source_cursors WHERE source_handle = ?1")?;
    let result = stmt
        .query_row(params![source_handle], |row| row.get(0))
        .optional()?;
    Ok(result)
}

/// Advance the global cursor for a source. Monotonic: a candidate id that
/// isn't newer than the stored value is a no-op, so the cursor never
/// regresses even on out-of-order writes.
pub fn advance_cursor(conn: &Connection, source_handle: &str, item_id: &str) -> Result<()> {
    if let Some(current) = get_cursor(conn, source_handle)? {
        if !crate::fetch::id_newer(item_id, &current) {
            return Ok(());
        }
    }
    conn.execute(
        "INSERT INTO source_cursors (source_handle, last_item_id, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(source_handle) DO UPDATE SET
            last_item_id = ?2,
            updated_at = datetime('now')",
        params![source_handle, item_id],
    )?;
    Ok(())
}

// --- Delivery log ---

/// Has this (subscriber, item) pair already been delivered?
pub fn delivery_exists(conn: &Connection, chat_id: i64, item_id: &str) -> Result<bool> {
    let mut stmt =
        conn.prepare("SELECT 1 FROM delivery_log WHERE chat_id = ?1 AND item_id = ?2")?;
    let found = stmt
        .query_row(params![chat_id, item_id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

/// Record a delivery (insert-if-absent).
pub fn record_delivery(conn: &Connection, chat_id: i64, item_id: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO delivery_log (chat_id, item_id) VALUES (?1, ?2)",
        params![chat_id, item_id],
    )?;
    Ok(())
}

/// Delete delivery records older than `days`. Returns the number pruned.
/// Storage hygiene only — old records stop mattering once the cursor has
/// moved past their items.
pub fn prune_deliveries(conn: &Connection, days: i64) -> Result<usize> {
    let pruned = conn.execute(
        "DELETE FROM delivery_log WHERE sent_at < datetime('now', '-' || ?1 || ' days')",
        params![days],
    )?;
    Ok(pruned)
}

// --- Stats ---

/// Aggregate counts for the `status` command.
pub fn stats(conn: &Connection) -> Result<StoreStats> {
    let count = |sql: &str| -> Result<i64> {
        Ok(conn.query_row(sql, [], |row| row.get(0))?)
    };
    Ok(StoreStats {
        subscribers: count("SELECT COUNT(*) FROM subscribers WHERE is_active = 1")?,
        subscriptions: count("SELECT COUNT(*) FROM subscriptions")?,
        sources: count("SELECT COUNT(DISTINCT source_handle) FROM subscriptions")?,
        keywords: count("SELECT COUNT(*) FROM keywords")?,
        deliveries: count("SELECT COUNT(*) FROM delivery_log")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn
    }

    #[test]
    fn test_cursor_monotonic() {
        let conn = test_conn();
        assert_eq!(get_cursor(&conn, "alice").unwrap(), None);

        advance_cursor(&conn, "alice", "100").unwrap();
        assert_eq!(get_cursor(&conn, "alice").unwrap(), Some("100".into()));

        // A lower id never regresses the cursor
        advance_cursor(&conn, "alice", "50").unwrap();
        assert_eq!(get_cursor(&conn, "alice").unwrap(), Some("100".into()));

        advance_cursor(&conn, "alice", "103").unwrap();
        assert_eq!(get_cursor(&conn, "alice").unwrap(), Some("103".into()));
    }

    #[test]
    fn test_cursor_numeric_not_lexicographic() {
        let conn = test_conn();
        advance_cursor(&conn, "alice", "999").unwrap();
        advance_cursor(&conn, "alice", "1000").unwrap();
        // "1000" < "999" as strings, but 1000 > 999 numerically
        assert_eq!(get_cursor(&conn, "alice").unwrap(), Some("1000".into()));
    }

    #[test]
    fn test_subscription_upsert_and_remove() {
        let conn = test_conn();
        ensure_subscriber(&conn, 7, Some("tester")).unwrap();
        upsert_subscription(&conn, 7, "alice", None, None).unwrap();
        // Re-adding is harmless and keeps the earlier values
        upsert_subscription(&conn, 7, "alice", Some("id-1"), None).unwrap();

        let subs = subscriptions_for(&conn, 7).unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].upstream_id.as_deref(), Some("id-1"));

        assert!(remove_subscription(&conn, 7, "alice").unwrap());
        assert!(!remove_subscription(&conn, 7, "alice").unwrap());
    }

    #[test]
    fn test_watched_sources_deduplicates() {
        let conn = test_conn();
        ensure_subscriber(&conn, 1, None).unwrap();
        ensure_subscriber(&conn, 2, None).unwrap();
        upsert_subscription(&conn, 1, "alice", None, None).unwrap();
        upsert_subscription(&conn, 2, "alice", None, None).unwrap();
        upsert_subscription(&conn, 2, "bob", None, None).unwrap();

        assert_eq!(
            watched_sources(&conn).unwrap(),
            vec!["alice".to_string(), "bob".to_string()]
        );
    }

    #[test]
    fn test_watchers_of_joins_settings() {
        let conn = test_conn();
        ensure_subscriber(&conn, 1, None).unwrap();
        upsert_subscription(&conn, 1, "alice", None, None).unwrap();
        set_setting(&conn, 1, SettingName::KeywordsOnly, true).unwrap();

        let watchers = watchers_of(&conn, "alice").unwrap();
        assert_eq!(watchers.len(), 1);
        assert!(watchers[0].settings.keywords_only);
        assert!(watchers[0].settings.alert_reposts);
    }

    #[test]
    fn test_watchers_of_defaults_without_settings_row() {
        let conn = test_conn();
        // Subscription without ensure_subscriber's settings row
        conn.execute("INSERT INTO subscribers (chat_id) VALUES (9)", [])
            .unwrap();
        upsert_subscription(&conn, 9, "alice", None, None).unwrap();

        let watchers = watchers_of(&conn, "alice").unwrap();
        assert_eq!(watchers.len(), 1);
        assert_eq!(watchers[0].settings, Settings::default());
    }

    #[test]
    fn test_keywords_case_handling() {
        let conn = test_conn();
        ensure_subscriber(&conn, 1, None).unwrap();
        assert!(add_keyword(&conn, 1, "Mint", false).unwrap());
        // Duplicate (stored lowercased)
        assert!(!add_keyword(&conn, 1, "mint", false).unwrap());
        assert!(add_keyword(&conn, 1, "NFT", true).unwrap());

        let keywords = keywords_for(&conn, 1).unwrap();
        assert_eq!(keywords.len(), 2);
        assert_eq!(keywords[0].pattern, "NFT");
        assert!(keywords[0].case_sensitive);
        assert_eq!(keywords[1].pattern, "mint");

        assert!(remove_keyword(&conn, 1, "MINT").unwrap());
        assert!(!remove_keyword(&conn, 1, "mint").unwrap());
    }

    #[test]
    fn test_settings_lazy_defaults() {
        let conn = test_conn();
        // No ensure_subscriber — first access creates the row
        let settings = get_settings(&conn, 42).unwrap();
        assert_eq!(settings, Settings::default());

        set_setting(&conn, 42, SettingName::Paused, true).unwrap();
        assert!(get_settings(&conn, 42).unwrap().paused);
    }

    #[test]
    fn test_delivery_dedup_and_prune() {
        let conn = test_conn();
        assert!(!delivery_exists(&conn, 1, "101").unwrap());
        record_delivery(&conn, 1, "101").unwrap();
        assert!(delivery_exists(&conn, 1, "101").unwrap());
        // Insert-if-absent: recording twice is a no-op
        record_delivery(&conn, 1, "101").unwrap();

        // Nothing is old enough to prune yet
        assert_eq!(prune_deliveries(&conn, 7).unwrap(), 0);

        // Backdate and prune
        conn.execute(
            "UPDATE delivery_log SET sent_at = datetime('now', '-10 days')",
            [],
        )
        .unwrap();
        assert_eq!(prune_deliveries(&conn, 7).unwrap(), 1);
        assert!(!delivery_exists(&conn, 1, "101").unwrap());
    }

    #[test]
    fn test_stats_counts() {
        let conn = test_conn();
        ensure_subscriber(&conn, 1, None).unwrap();
        ensure_subscriber(&conn, 2, None).unwrap();
        upsert_subscription(&conn, 1, "alice", None, None).unwrap();
        upsert_subscription(&conn, 2, "alice", None, None).unwrap();
        add_keyword(&conn, 1, "mint", false).unwrap();
        record_delivery(&conn, 1, "101").unwrap();

        let stats = stats(&conn).unwrap();
        assert_eq!(stats.subscribers, 2);
        assert_eq!(stats.subscriptions, 2);
        assert_eq!(stats.sources, 1);
        assert_eq!(stats.keywords, 1);
        assert_eq!(stats.deliveries, 1);
    }
}
