// Dedup & delivery dispatcher — fans one item out to every watcher of its
// source, at most once per (subscriber, item) pair.
//
// Ordering choice: the delivery record is written only after the notifier
// acknowledges. A notifier failure therefore leaves no record (the pair can
// be retried on a future cycle while it's still in the fetch window), and a
// crash between ack and record is the one accepted duplicate window.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::db::models::Watcher;
use crate::db::Database;
use crate::fetch::{passes_since, Item};
use crate::filter;
use crate::notify::{render_alert, Notifier};

/// Deliver one item to every eligible watcher. Returns the number of
/// successful deliveries.
///
/// Notifier failures are isolated per (subscriber, item): logged, no
/// delivery record written, and the loop moves on to the next watcher.
/// Database errors propagate — they mean the store itself is broken.
pub async fn dispatch_item(
    db: &dyn Database,
    notifier: &dyn Notifier,
    item: &Item,
    watchers: &[Watcher],
) -> Result<usize> {
    let mut delivered = 0;

    for watcher in watchers {
        // Channel disabled: nothing to deliver, and no record either — the
        // cursor still advances, so re-enabling doesn't replay history.
        if !watcher.settings.telegram_enabled {
            continue;
        }

        // Subscribers seeded after this item was posted never see it.
        if let Some(ref seed) = watcher.seed_cursor {
            if !passes_since(&item.id, seed) {
                continue;
            }
        }

        // Idempotent re-poll safety: an existing record means this pair was
        // already decided. Never evaluate it again.
        if db.delivery_exists(watcher.chat_id, &item.id).await? {
            continue;
        }

        let keywords = db.keywords_for(watcher.chat_id).await?;
        let decision = filter::evaluate(item, &watcher.settings, &keywords);

        if !decision.send {
            debug!(
                chat_id = watcher.chat_id,
                item_id = %item.id,
                reason = %decision.reason,
                "Item skipped"
            );
            continue;
        }

        let message = render_alert(item, &decision.matched);
        match notifier.notify(watcher.chat_id, &message).await {
            Ok(()) => {
                db.record_delivery(watcher.chat_id, &item.id).await?;
                delivered += 1;
                info!(
                    chat_id = watcher.chat_id,
                    item_id = %item.id,
                    source = %item.author,
                    reason = %decision.reason,
                    "Alert delivered"
                );
            }
            Err(e) => {
                // No record: this pair stays undelivered and other watchers
                // are unaffected.
                warn!(
                    chat_id = watcher.chat_id,
                    item_id = %item.id,
                    error = %e,
                    "Notifier failed, delivery not recorded"
                );
            }
        }
    }

    Ok(delivered)
}
