// Command-surface tests — subscription, keyword, and settings flows driven
// through the `commands` layer against an in-memory database.

use std::sync::Arc;

use rusqlite::Connection;

use kestrel::commands;
use kestrel::db::schema::create_tables;
use kestrel::db::{Database, SqliteDatabase};

fn test_db() -> Arc<dyn Database> {
    let conn = Connection::open_in_memory().unwrap();
    create_tables(&conn).unwrap();
    Arc::new(SqliteDatabase::new(conn))
}

#[tokio::test]
async fn subscribe_normalizes_and_is_idempotent() {
    let db = test_db();

    let handle = commands::add_subscription(db.as_ref(), 7, "@SomeUser", false)
        .await
        .unwrap();
    assert_eq!(handle, "someuser");

    // Re-subscribing with a different spelling lands on the same row
    commands::add_subscription(db.as_ref(), 7, "  someUSER ", false)
        .await
        .unwrap();

    let subs = db.subscriptions_for(7).await.unwrap();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].source_handle, "someuser");
    assert_eq!(db.watched_sources().await.unwrap(), vec!["someuser"]);
}

#[tokio::test]
async fn subscribe_rejects_empty_handle() {
    let db = test_db();
    assert!(commands::add_subscription(db.as_ref(), 7, "@", false)
        .await
        .is_err());
}

#[tokio::test]
async fn from_now_records_the_current_cursor() {
    let db = test_db();
    db.advance_cursor("someuser", "4200").await.unwrap();

    commands::add_subscription(db.as_ref(), 7, "someuser", true)
        .await
        .unwrap();

    let subs = db.subscriptions_for(7).await.unwrap();
    assert_eq!(subs[0].seed_cursor, Some("4200".to_string()));

    // Without from_now, no seed — the subscriber replays the fetch window
    commands::add_subscription(db.as_ref(), 8, "someuser", false)
        .await
        .unwrap();
    let subs = db.subscriptions_for(8).await.unwrap();
    assert_eq!(subs[0].seed_cursor, None);
}

#[tokio::test]
async fn unsubscribe_leaves_cursor_intact() {
    let db = test_db();
    commands::add_subscription(db.as_ref(), 7, "someuser", false)
        .await
        .unwrap();
    db.advance_cursor("someuser", "100").await.unwrap();

    assert!(commands::remove_subscription(db.as_ref(), 7, "@SomeUser")
        .await
        .unwrap());
    assert!(!commands::remove_subscription(db.as_ref(), 7, "someuser")
        .await
        .unwrap());

    // Cursor survives for any future or concurrent watcher
    assert_eq!(
        db.get_cursor("someuser").await.unwrap(),
        Some("100".to_string())
    );
}

#[tokio::test]
async fn keyword_flow_dedupes_and_validates() {
    let db = test_db();

    assert!(commands::add_keyword(db.as_ref(), 7, "Giveaway", false)
        .await
        .unwrap());
    // Case-insensitive keywords are stored lowercased, so this is a dup
    assert!(!commands::add_keyword(db.as_ref(), 7, "giveaway", false)
        .await
        .unwrap());
    assert!(commands::add_keyword(db.as_ref(), 7, "", false).await.is_err());

    assert!(commands::remove_keyword(db.as_ref(), 7, "GIVEAWAY")
        .await
        .unwrap());
    assert!(db.keywords_for(7).await.unwrap().is_empty());
}

#[tokio::test]
async fn update_setting_by_name() {
    let db = test_db();
    db.ensure_subscriber(7, None).await.unwrap();

    commands::update_setting(db.as_ref(), 7, "keywords_only", true)
        .await
        .unwrap();
    assert!(db.get_settings(7).await.unwrap().keywords_only);

    assert!(commands::update_setting(db.as_ref(), 7, "nonsense", true)
        .await
        .is_err());
}

#[tokio::test]
async fn toggle_flips_and_rejects_unknown_names() {
    let db = test_db();
    db.ensure_subscriber(7, None).await.unwrap();

    let (_, value) = commands::toggle_setting(db.as_ref(), 7, "reposts")
        .await
        .unwrap();
    assert!(!value);
    let (_, value) = commands::toggle_setting(db.as_ref(), 7, "reposts")
        .await
        .unwrap();
    assert!(value);

    assert!(commands::toggle_setting(db.as_ref(), 7, "carrier_pigeon")
        .await
        .is_err());
}

#[tokio::test]
async fn pause_and_resume() {
    let db = test_db();
    db.ensure_subscriber(7, None).await.unwrap();

    commands::pause(db.as_ref(), 7).await.unwrap();
    assert!(db.get_settings(7).await.unwrap().paused);

    commands::resume(db.as_ref(), 7).await.unwrap();
    assert!(!db.get_settings(7).await.unwrap().paused);
}
