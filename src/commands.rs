// Front-end command surface — the operations a chat front-end (or the CLI)
// calls into. Free-text handles and setting names are normalized/validated
// here, so nothing below this layer ever sees an '@' prefix or an unknown
// setting name.

use anyhow::Result;

use crate::db::models::SettingName;
use crate::db::Database;

/// Normalize a source handle: strip the leading '@', trim, lowercase.
/// All storage and comparison uses the normalized form.
pub fn normalize_handle(raw: &str) -> String {
    raw.trim().trim_start_matches('@').to_lowercase()
}

/// Subscribe a chat to a source. Returns the normalized handle.
///
/// With `from_now`, the source's current global cursor is recorded as the
/// subscriber's seed so items already in the fetch window aren't replayed
/// to them.
pub async fn add_subscription(
    db: &dyn Database,
    chat_id: i64,
    handle: &str,
    from_now: bool,
) -> Result<String> {
    let handle = normalize_handle(handle);
    if handle.is_empty() {
        anyhow::bail!("Source handle must not be empty");
    }

    db.ensure_subscriber(chat_id, None).await?;

    let seed = if from_now {
        db.get_cursor(&handle).await?
    } else {
        None
    };

    db.upsert_subscription(chat_id, &handle, None, seed.as_deref())
        .await?;
    Ok(handle)
}

/// Unsubscribe a chat from a source. Returns false if there was no
/// subscription. The source's global cursor is untouched — other
/// subscribers may still watch it.
pub async fn remove_subscription(db: &dyn Database, chat_id: i64, handle: &str) -> Result<bool> {
    db.remove_subscription(chat_id, &normalize_handle(handle))
        .await
}

/// Add a keyword filter. Returns false on duplicate.
pub async fn add_keyword(
    db: &dyn Database,
    chat_id: i64,
    pattern: &str,
    case_sensitive: bool,
) -> Result<bool> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        anyhow::bail!("Keyword must not be empty");
    }
    db.ensure_subscriber(chat_id, None).await?;
    db.add_keyword(chat_id, pattern, case_sensitive).await
}

/// Remove a keyword filter. Returns false if it wasn't set.
pub async fn remove_keyword(db: &dyn Database, chat_id: i64, pattern: &str) -> Result<bool> {
    db.remove_keyword(chat_id, pattern.trim()).await
}

/// Set a setting by free-text name. Unknown names are a configuration
/// error, surfaced to the caller — not retried, not guessed at.
pub async fn update_setting(
    db: &dyn Database,
    chat_id: i64,
    name: &str,
    value: bool,
) -> Result<SettingName> {
    let name: SettingName = name.parse()?;
    db.set_setting(chat_id, name, value).await?;
    Ok(name)
}

/// Flip a setting by free-text name. Returns the new value.
pub async fn toggle_setting(
    db: &dyn Database,
    chat_id: i64,
    name: &str,
) -> Result<(SettingName, bool)> {
    let name: SettingName = name.parse()?;
    let settings = db.get_settings(chat_id).await?;
    let new_value = !name.get(&settings);
    db.set_setting(chat_id, name, new_value).await?;
    Ok((name, new_value))
}

/// Pause all alerts for a chat.
pub async fn pause(db: &dyn Database, chat_id: i64) -> Result<()> {
    db.set_setting(chat_id, SettingName::Paused, true).await
}

/// Resume alerts for a chat.
pub async fn resume(db: &dyn Database, chat_id: i64) -> Result<()> {
    db.set_setting(chat_id, SettingName::Paused, false).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_handle() {
        assert_eq!(normalize_handle("@SomeUser"), "someuser");
        assert_eq!(normalize_handle("  @Mixed_Case  "), "mixed_case");
        assert_eq!(normalize_handle("plain"), "plain");
        assert_eq!(normalize_handle("@"), "");
    }
}
