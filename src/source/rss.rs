use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use crate::app::{Result, TickerError};
use crate::fetcher::reachability::ReachabilityGate;
use crate::fetcher::{CancelToken, Fetcher};
use crate::normalizer::{FeedMapping, Normalizer};
use crate::source::{FetchRequest, Fetched, SourceClient, MAX_ITEMS};

/// Client for any source that publishes a whole RSS/Atom document per
/// category. One request per cycle; there is no cheap change check, so
/// every cycle yields items.
pub struct RssClient {
    name: String,
    mapping: FeedMapping,
    fetcher: Arc<dyn Fetcher>,
    reachability: Arc<ReachabilityGate>,
    normalizer: Normalizer,
}

impl RssClient {
    pub fn new(
        name: impl Into<String>,
        mapping: FeedMapping,
        fetcher: Arc<dyn Fetcher>,
        reachability: Arc<ReachabilityGate>,
    ) -> Self {
        Self {
            name: name.into(),
            mapping,
            fetcher,
            reachability,
            normalizer: Normalizer::new(),
        }
    }
}

#[async_trait]
impl SourceClient for RssClient {
    fn max_items(&self) -> usize {
        MAX_ITEMS
    }

    async fn fetch_all(&mut self, request: &FetchRequest, cancel: &CancelToken) -> Result<Fetched> {
        cancel.run(self.reachability.ensure_online()).await?;

        info!("Fetching {} feed {}", self.name, request.locator);
        let body = cancel.run(self.fetcher.fetch(&request.locator)).await?;

        let mut items = self.normalizer.normalize(&body, self.mapping, Utc::now())?;
        if items.is_empty() {
            return Err(TickerError::NoItems);
        }

        items.truncate(request.max_items);
        debug!("{} returned {} items", self.name, items.len());

        cancel.check()?;
        Ok(Fetched::Items(items.into_iter().map(Arc::new).collect()))
    }
}
