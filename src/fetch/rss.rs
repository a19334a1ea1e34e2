// RSS timeline fetcher — reads a source's timeline via a mirror RSS feed.
//
// A timeline lives at `{endpoint}/{handle}/rss`. The mirrors encode the
// post id in the entry link (`.../{handle}/status/{id}#m`) and the post
// text as HTML in the description, so both need unpacking here.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::traits::{FetchError, SourceFetcher};
use super::{classify, extract_mentions, passes_since, strip_html, Item};

/// Canonical upstream site used when rewriting mirror links in alerts.
pub const UPSTREAM_URL: &str = "https://twitter.com";

pub struct RssTimelineFetcher {
    client: reqwest::Client,
}

impl RssTimelineFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent("kestrel/0.1 (account watcher)")
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SourceFetcher for RssTimelineFetcher {
    async fn fetch(
        &self,
        endpoint: &str,
        handle: &str,
        since: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Item>, FetchError> {
        let url = format!("{}/{}/rss", endpoint.trim_end_matches('/'), handle);
        debug!(url = %url, "Fetching timeline feed");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::UnknownSource(handle.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.bytes().await?;
        let feed = feed_rs::parser::parse(&body[..]).map_err(|e| FetchError::Parse {
            handle: handle.to_string(),
            message: e.to_string(),
        })?;

        // Entries arrive newest-first; collect, since-filter, then reverse
        // so the pipeline processes oldest-first.
        let mut items: Vec<Item> = feed
            .entries
            .iter()
            .take(limit)
            .filter_map(|entry| {
                let link = entry.links.first().map(|l| l.href.clone())?;
                let id = item_id_from_link(&link).unwrap_or_else(|| entry.id.clone());

                let title = entry
                    .title
                    .as_ref()
                    .map(|t| t.content.clone())
                    .unwrap_or_default();
                let raw = entry
                    .summary
                    .as_ref()
                    .map(|t| t.content.clone())
                    .unwrap_or_else(|| title.clone());
                let text = strip_html(&raw);
                let kind = classify(&title, &text);

                Some(Item {
                    mentions: extract_mentions(&text),
                    link: canonical_link(&link, endpoint, handle, &id),
                    created_at: entry.published,
                    kind,
                    author: handle.to_string(),
                    text,
                    id,
                })
            })
            .filter(|item| match since {
                Some(cursor) => passes_since(&item.id, cursor),
                None => true,
            })
            .collect();
        items.reverse();

        debug!(
            handle = handle,
            count = items.len(),
            "Timeline fetch complete"
        );
        Ok(items)
    }
}

/// Pull the post id out of a mirror status link
/// (`https://mirror.example/user/status/123456#m` -> `123456`).
fn item_id_from_link(link: &str) -> Option<String> {
    let after = link.split("/status/").nth(1)?;
    let id = after.split('#').next().unwrap_or(after);
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Rewrite a mirror link to the canonical upstream site.
fn canonical_link(link: &str, endpoint: &str, handle: &str, id: &str) -> String {
    let endpoint = endpoint.trim_end_matches('/');
    if link.starts_with(endpoint) {
        link.replacen(endpoint, UPSTREAM_URL, 1)
    } else {
        format!("{UPSTREAM_URL}/{handle}/status/{id}")
    }
}
