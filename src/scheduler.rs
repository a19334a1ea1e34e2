// Poll scheduler — the single recurring loop driving the pipeline.
//
// Sources are checked sequentially, never in parallel: deliberate
// serialization keeps us under upstream anti-scraping thresholds and
// removes any need for per-source locking. The endpoint pool's rotation
// index lives here and persists across sources and cycles.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::Database;
use crate::dispatch;
use crate::fetch::endpoints::EndpointPool;
use crate::fetch::traits::SourceFetcher;
use crate::fetch::Item;
use crate::notify::Notifier;

const PRUNE_EVERY: Duration = Duration::from_secs(24 * 60 * 60);

pub struct Poller {
    db: Arc<dyn Database>,
    fetcher: Arc<dyn SourceFetcher>,
    notifier: Arc<dyn Notifier>,
    pool: EndpointPool,
    poll_interval: Duration,
    source_delay: Duration,
    fetch_limit: usize,
    retention_days: i64,
    last_prune: Option<Instant>,
}

impl Poller {
    pub fn new(
        config: &Config,
        db: Arc<dyn Database>,
        fetcher: Arc<dyn SourceFetcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            db,
            fetcher,
            notifier,
            pool: EndpointPool::new(&config.endpoints),
            poll_interval: config.poll_interval,
            source_delay: config.source_delay,
            fetch_limit: config.fetch_limit,
            retention_days: config.retention_days,
            last_prune: None,
        }
    }

    /// Run the polling loop until the shutdown signal fires.
    ///
    /// A cycle always runs to completion (including inter-source delays)
    /// before the next one is scheduled — cycles never overlap. Shutdown
    /// stops scheduling; an in-flight source check finishes first.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            endpoints = self.pool.len(),
            "Poller started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.run_cycle(&shutdown).await;
            self.maybe_prune().await;

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.changed() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        info!("Poller stopped");
        Ok(())
    }

    /// One pass over all watched sources. Per-source failures are logged
    /// and never abort the cycle.
    async fn run_cycle(&mut self, shutdown: &watch::Receiver<bool>) {
        let sources = match self.db.watched_sources().await {
            Ok(sources) => sources,
            Err(e) => {
                warn!(error = %e, "Could not load watched sources, skipping cycle");
                return;
            }
        };

        if sources.is_empty() {
            return;
        }

        debug!(count = sources.len(), "Checking watched sources");

        for (i, handle) in sources.iter().enumerate() {
            // Finish the in-flight check on shutdown, but start no new one.
            if *shutdown.borrow() {
                break;
            }

            if let Err(e) = self.check_source(handle).await {
                warn!(source = %handle, error = %e, "Source check failed, continuing cycle");
            }

            // Inter-source spacing for upstream rate limits
            if i + 1 < sources.len() {
                tokio::time::sleep(self.source_delay).await;
            }
        }
    }

    /// Check one source: read cursor, fetch with endpoint failover, fan out
    /// each item oldest-first, advancing the cursor after each item is fully
    /// dispatched — a mid-batch failure leaves no gap behind the cursor.
    ///
    /// Also the out-of-band manual trigger (`kestrel check <handle>`).
    /// Returns the number of alerts delivered.
    pub async fn check_source(&mut self, handle: &str) -> Result<usize> {
        let since = self.db.get_cursor(handle).await?;
        let items = self.fetch_with_failover(handle, since.as_deref()).await?;

        if items.is_empty() {
            debug!(source = handle, "No new items");
            return Ok(0);
        }

        info!(source = handle, count = items.len(), "New items fetched");

        let watchers = self.db.watchers_of(handle).await?;
        let mut delivered = 0;

        for item in &items {
            delivered += dispatch::dispatch_item(
                self.db.as_ref(),
                self.notifier.as_ref(),
                item,
                &watchers,
            )
            .await?;
            self.db.advance_cursor(handle, &item.id).await?;
        }

        Ok(delivered)
    }

    /// Fetch via the current endpoint, rotating on failure. At most one
    /// attempt per endpoint; exhaustion abandons the source for this cycle
    /// with the cursor untouched.
    async fn fetch_with_failover(&mut self, handle: &str, since: Option<&str>) -> Result<Vec<Item>> {
        let attempts = self.pool.len();

        for attempt in 1..=attempts {
            let endpoint = self.pool.current().to_string();
            match self
                .fetcher
                .fetch(&endpoint, handle, since, self.fetch_limit)
                .await
            {
                Ok(items) => return Ok(items),
                Err(e) => {
                    warn!(
                        endpoint = %endpoint,
                        source = handle,
                        attempt,
                        error = %e,
                        "Fetch failed, rotating endpoint"
                    );
                    self.pool.rotate();
                }
            }
        }

        anyhow::bail!("All {attempts} endpoints failed for @{handle}; retrying next cycle")
    }

    /// Daily retention sweep of the delivery log. Storage hygiene, not
    /// correctness — failures are logged and retried next time around.
    async fn maybe_prune(&mut self) {
        let due = self
            .last_prune
            .map(|t| t.elapsed() >= PRUNE_EVERY)
            .unwrap_or(true);
        if !due {
            return;
        }

        match self.db.prune_deliveries(self.retention_days).await {
            Ok(pruned) => {
                if pruned > 0 {
                    info!(pruned, "Old delivery records pruned");
                }
                self.last_prune = Some(Instant::now());
            }
            Err(e) => warn!(error = %e, "Delivery log pruning failed"),
        }
    }
}
