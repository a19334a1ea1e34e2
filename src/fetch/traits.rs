// Source fetcher trait — the boundary the pipeline depends on.
//
// Implementations must return items oldest-first and strictly newer than
// the cursor when ids compare numerically (fail-open for odd ids). An
// empty timeline is a successful empty result, not an error.

use async_trait::async_trait;
use thiserror::Error;

use super::Item;

/// Errors a fetch backend can signal. Within a cycle the scheduler treats
/// all of these as transient: rotate the endpoint pool and retry, up to
/// one attempt per endpoint.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("endpoint request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("feed parse failed for @{handle}: {message}")]
    Parse { handle: String, message: String },

    #[error("unknown source @{0}")]
    UnknownSource(String),
}

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetch up to `limit` items for `handle` via `endpoint`, strictly newer
    /// than `since` when comparable. Results are ordered oldest-first.
    async fn fetch(
        &self,
        endpoint: &str,
        handle: &str,
        since: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Item>, FetchError>;
}
