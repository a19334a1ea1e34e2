// Notifier boundary — how rendered alerts leave the pipeline.
//
// The dispatcher only sees the `Notifier` trait; the Telegram backend is
// one implementation. Alert text is rendered here (HTML for Telegram's
// parse_mode) so user-supplied post text is escaped exactly once.

pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

use crate::fetch::Item;

/// Delivery channel for rendered alerts. Implementations must be async
/// because real channels are HTTP APIs.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one rendered message to one subscriber channel.
    async fn notify(&self, channel_id: i64, message: &str) -> Result<()>;
}

/// Escape the characters Telegram's HTML parse mode treats specially.
/// `&` must be replaced first or it would re-escape the entities.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Render an alert message for one item.
///
/// Layout follows the badge/author/text/matched/link shape the chat
/// front-end expects; post text is HTML-escaped, the link is the canonical
/// upstream URL.
pub fn render_alert(item: &Item, matched: &[String]) -> String {
    let (emoji, label) = item.kind.badge();

    let mut message = format!("{emoji} <b>{label} Alert</b>\n\n");
    message.push_str(&format!("\u{1F464} <b>@{}</b>\n", item.author));
    message.push_str(&format!("\u{1F4DD} {}\n", escape_html(&item.text)));

    if !matched.is_empty() {
        message.push_str(&format!(
            "\n\u{1F511} <i>Matched: {}</i>\n",
            escape_html(&matched.join(", "))
        ));
    }

    message.push_str(&format!(
        "\n\u{1F517} <a href=\"{}\">View post</a>",
        item.link
    ));
    message
}
