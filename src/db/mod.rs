// Database layer — SQLite storage for subscriptions, keywords, settings,
// source cursors, and the delivery log.
//
// We use rusqlite with the "bundled" feature so there's no system SQLite
// dependency. The database file lives wherever KESTREL_DB_PATH points
// (defaults to ./kestrel.db).

pub mod models;
pub mod queries;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use sqlite::SqliteDatabase;
pub use traits::Database;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Open (or create) the database and run migrations.
///
/// This is the main entry point — called by `kestrel init` and by any
/// command that needs database access.
pub fn initialize(db_path: &str) -> Result<Connection> {
    // Create parent directories if needed
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory for database: {}", db_path))?;
        }
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    // Enable WAL mode for better concurrent read performance
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // Run schema creation / migrations
    schema::create_tables(&conn)?;

    Ok(conn)
}

/// Open an existing database (fails if it doesn't exist yet).
pub fn open(db_path: &str) -> Result<Connection> {
    if !Path::new(db_path).exists() {
        anyhow::bail!(
            "Database not found at {}. Run `kestrel init` first.",
            db_path
        );
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;

    Ok(conn)
}

/// Open an existing database behind the async `Database` trait.
pub fn open_sqlite(db_path: &str) -> Result<Arc<dyn Database>> {
    Ok(Arc::new(SqliteDatabase::new(open(db_path)?)))
}

/// Create the database if needed, behind the async `Database` trait.
pub fn initialize_sqlite(db_path: &str) -> Result<Arc<dyn Database>> {
    Ok(Arc::new(SqliteDatabase::new(initialize(db_path)?)))
}
