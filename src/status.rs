// System status display — DB stats, watched sources, cursor positions.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::db::Database;

/// Display system status to the terminal.
pub async fn show(db: &Arc<dyn Database>, db_display_path: &str, retention_days: i64) -> Result<()> {
    if !Path::new(db_display_path).exists() {
        println!("Database: not initialized");
        println!("\nRun `kestrel init` to set up the database.");
        return Ok(());
    }

    // Database file size
    let file_size = std::fs::metadata(db_display_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Database: {} ({})", db_display_path, file_size);

    let stats = db.stats().await?;
    println!(
        "Subscribers: {} active, {} subscriptions, {} keywords",
        stats.subscribers, stats.subscriptions, stats.keywords
    );
    println!(
        "Deliveries: {} recorded (pruned after {} days)",
        stats.deliveries, retention_days
    );

    // Watched sources with their cursor positions
    let sources = db.watched_sources().await?;
    if sources.is_empty() {
        println!("Watched sources: none");
        println!("  Add one with `kestrel add <handle> --chat <id>`");
    } else {
        println!("Watched sources: {}", sources.len());
        for handle in &sources {
            match db.get_cursor(handle).await? {
                Some(cursor) => println!("  @{handle} (cursor {cursor})"),
                None => println!("  @{handle} (never fetched)"),
            }
        }
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
