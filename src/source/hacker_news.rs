//! Tree-API client for Hacker News.
//!
//! A cycle is: read `maxitem.json`; skip everything if it has not grown
//! (unless forced); read the category listing; fetch each listed item,
//! serving repeats from the [`ItemCache`].
//!
//! Per-item failures are lossy but resilient: the item is logged and left
//! out, the rest of the batch continues. Failures of the max-item read or
//! the listing abort the cycle.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::app::{Result, TickerError};
use crate::domain::ContentItem;
use crate::fetcher::reachability::ReachabilityGate;
use crate::fetcher::{CancelToken, Fetcher};
use crate::source::cache::ItemCache;
use crate::source::id_array::parse_ids;
use crate::source::{FetchRequest, Fetched, SourceClient, MAX_ITEMS};

pub const DISCUSSION_URL: &str = "https://news.ycombinator.com/item?id=";

/// Wire shape of `item/{id}.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HnItem {
    pub id: i64,
    pub deleted: bool,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub by: Option<String>,
    pub time: i64,
    pub text: Option<String>,
    pub dead: bool,
    pub parent: Option<i64>,
    pub poll: Option<i64>,
    pub kids: Vec<i64>,
    pub url: Option<String>,
    pub score: u32,
    pub title: Option<String>,
    pub parts: Vec<u32>,
    pub descendants: u32,
}

impl HnItem {
    pub fn discussion_link(&self) -> String {
        format!("{}{}", DISCUSSION_URL, self.id)
    }

    pub fn into_content_item(self) -> ContentItem {
        let discussion = self.discussion_link();
        let created_at = DateTime::<Utc>::from_timestamp(self.time, 0).unwrap_or_default();
        let headline = format!(
            "({}) {}",
            self.kids.len(),
            self.title.as_deref().unwrap_or_default()
        );

        ContentItem::with_id(self.id, headline, created_at)
            .with_link(self.url.unwrap_or_else(|| discussion.clone()))
            .with_secondary_link(discussion)
            .with_sub_items(self.kids)
    }
}

pub struct HackerNewsClient {
    base: String,
    fetcher: Arc<dyn Fetcher>,
    reachability: Arc<ReachabilityGate>,
    cache: ItemCache,
    last_max_id: i64,
}

impl HackerNewsClient {
    pub fn new(
        base: impl Into<String>,
        fetcher: Arc<dyn Fetcher>,
        reachability: Arc<ReachabilityGate>,
    ) -> Self {
        Self {
            base: base.into(),
            fetcher,
            reachability,
            cache: ItemCache::new(),
            last_max_id: 0,
        }
    }

    pub fn with_cache(mut self, cache: ItemCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &ItemCache {
        &self.cache
    }

    pub fn last_max_id(&self) -> i64 {
        self.last_max_id
    }

    /// Newest item id on the server and whether it is above the last id a
    /// completed cycle saw.
    pub async fn highest_id(&self, cancel: &CancelToken) -> Result<(i64, bool)> {
        info!("Fetching highest item");
        let url = format!("{}/maxitem.json", self.base);
        let body = cancel.run(self.fetcher.fetch(&url)).await?;

        let text = String::from_utf8_lossy(&body);
        let max_id = text.trim().parse::<i64>().map_err(|_| {
            TickerError::IdList(format!("error parsing maxitem, body was {}", text.trim()))
        })?;
        debug!("Value retrieved {}", max_id);

        Ok((max_id, max_id > self.last_max_id))
    }

    pub async fn ids_for(&self, locator: &str, cancel: &CancelToken) -> Result<Vec<i64>> {
        let body = cancel.run(self.fetcher.fetch(locator)).await?;
        let ids = parse_ids(&body);
        debug!("Retrieved {} ids for {}", ids.len(), locator);

        if ids.is_empty() {
            return Err(TickerError::NoItems);
        }
        Ok(ids)
    }

    /// `Ok(None)` when the server has no body for the id.
    pub async fn item(&mut self, id: i64, cancel: &CancelToken) -> Result<Option<Arc<ContentItem>>> {
        if let Some(hit) = self.cache.get(id) {
            return Ok(Some(hit));
        }

        let url = format!("{}/item/{}.json", self.base, id);
        let body = cancel.run(self.fetcher.fetch(&url)).await?;

        let Some(raw) = serde_json::from_slice::<Option<HnItem>>(&body)? else {
            return Ok(None);
        };

        let item = Arc::new(raw.into_content_item());
        self.cache.insert(id, item.clone());
        Ok(Some(item))
    }
}

#[async_trait]
impl SourceClient for HackerNewsClient {
    fn max_items(&self) -> usize {
        MAX_ITEMS
    }

    async fn fetch_all(&mut self, request: &FetchRequest, cancel: &CancelToken) -> Result<Fetched> {
        self.cache.clear_if_over_limit();
        cancel.run(self.reachability.ensure_online()).await?;

        let (max_id, changed) = self.highest_id(cancel).await?;
        if !changed && !request.force {
            info!("No refresh needed");
            return Ok(Fetched::Unchanged);
        }
        info!("Refresh needed");

        let ids = self.ids_for(&request.locator, cancel).await?;
        let wanted = request.max_items.min(ids.len());
        let mut items = Vec::with_capacity(wanted);

        for &id in &ids[..wanted] {
            match self.item(id, cancel).await {
                Ok(Some(item)) => items.push(item),
                Ok(None) => debug!("Item {} has no content", id),
                Err(TickerError::Cancelled) => return Err(TickerError::Cancelled),
                Err(e) => warn!("Skipping item {}: {}", id, e),
            }
        }

        cancel.check()?;
        self.last_max_id = max_id;
        Ok(Fetched::Items(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::stub::{StaticReachability, StubFetcher};
    use crate::fetcher::CancelSource;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    const BASE: &str = "https://hn.test/v0";
    const LISTING: &str = "https://hn.test/v0/topstories.json";

    fn item_url(id: i64) -> String {
        format!("{BASE}/item/{id}.json")
    }

    fn item_body(id: i64, title: &str, kids: &[i64]) -> Vec<u8> {
        json!({
            "id": id,
            "type": "story",
            "by": "someone",
            "time": 1_700_000_000 + id,
            "title": title,
            "url": format!("https://example.com/{id}"),
            "kids": kids,
            "score": 10,
            "descendants": kids.len(),
        })
        .to_string()
        .into_bytes()
    }

    fn setup() -> (Arc<StubFetcher>, Arc<StaticReachability>, HackerNewsClient) {
        let fetcher = Arc::new(StubFetcher::new());
        fetcher.respond(&format!("{BASE}/maxitem.json"), "100");
        fetcher.respond(LISTING, "[3,1,2]");
        fetcher.respond(&item_url(1), item_body(1, "One", &[]));
        fetcher.respond(&item_url(2), item_body(2, "Two", &[20, 21]));
        fetcher.respond(&item_url(3), item_body(3, "Three", &[30]));

        let probe = Arc::new(StaticReachability::new(true));
        let gate = Arc::new(ReachabilityGate::new(probe.clone()));
        let client = HackerNewsClient::new(BASE, fetcher.clone(), gate);
        (fetcher, probe, client)
    }

    fn request(force: bool) -> FetchRequest {
        FetchRequest {
            locator: LISTING.to_string(),
            max_items: MAX_ITEMS,
            force,
        }
    }

    fn expect_items(fetched: Fetched) -> Vec<Arc<ContentItem>> {
        match fetched {
            Fetched::Items(items) => items,
            Fetched::Unchanged => panic!("expected items"),
        }
    }

    #[test]
    fn test_item_mapping() {
        let raw: HnItem = serde_json::from_slice(&item_body(7, "Show HN: a thing", &[8, 9])).unwrap();
        let item = raw.into_content_item();

        assert_eq!(item.id(), Some(7));
        assert_eq!(item.headline(), "(2) Show HN: a thing");
        assert_eq!(item.link(), Some("https://example.com/7"));
        assert_eq!(
            item.secondary_link(),
            Some("https://news.ycombinator.com/item?id=7")
        );
        assert_eq!(item.sub_item_ids(), &[8, 9]);
        assert_eq!(item.created_at().timestamp(), 1_700_000_007);
        assert!(!item.has_summary());
    }

    #[test]
    fn test_item_without_url_links_to_discussion() {
        let raw: HnItem = serde_json::from_str(r#"{"id":5,"title":"Ask HN: why?","time":1}"#).unwrap();
        let item = raw.into_content_item();
        assert_eq!(item.headline(), "(0) Ask HN: why?");
        assert_eq!(item.link(), Some("https://news.ycombinator.com/item?id=5"));
    }

    #[tokio::test]
    async fn test_forced_fetch_preserves_listing_order() {
        let (_fetcher, _probe, mut client) = setup();
        let source = CancelSource::new();

        let items = expect_items(assert_ok!(client.fetch_all(&request(true), &source.token()).await));

        let ids: Vec<_> = items.iter().map(|i| i.id().unwrap()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(items[2].headline(), "(2) Two");
        assert_eq!(client.last_max_id(), 100);
        assert_eq!(client.cache().len(), 3);
    }

    #[tokio::test]
    async fn test_unchanged_max_skips_fan_out() {
        let (fetcher, _probe, mut client) = setup();
        let source = CancelSource::new();

        assert_ok!(client.fetch_all(&request(true), &source.token()).await);
        let second = assert_ok!(client.fetch_all(&request(false), &source.token()).await);

        assert!(matches!(second, Fetched::Unchanged));
        assert_eq!(fetcher.calls_to(LISTING), 1);
    }

    #[tokio::test]
    async fn test_force_overrides_unchanged_max() {
        let (fetcher, _probe, mut client) = setup();
        let source = CancelSource::new();

        assert_ok!(client.fetch_all(&request(true), &source.token()).await);
        let second = assert_ok!(client.fetch_all(&request(true), &source.token()).await);

        assert_eq!(expect_items(second).len(), 3);
        assert_eq!(fetcher.calls_to(LISTING), 2);
    }

    #[tokio::test]
    async fn test_new_max_reuses_cached_items() {
        let (fetcher, _probe, mut client) = setup();
        let source = CancelSource::new();

        assert_ok!(client.fetch_all(&request(true), &source.token()).await);
        fetcher.respond(&format!("{BASE}/maxitem.json"), "101");
        fetcher.respond(LISTING, "[4,3,1,2]");
        fetcher.respond(&item_url(4), item_body(4, "Four", &[]));

        let items = expect_items(assert_ok!(client.fetch_all(&request(false), &source.token()).await));

        assert_eq!(items.len(), 4);
        for id in 1..=3 {
            assert_eq!(fetcher.calls_to(&item_url(id)), 1, "item {id} served from cache");
        }
        assert_eq!(fetcher.calls_to(&item_url(4)), 1);
    }

    #[tokio::test]
    async fn test_failed_item_is_skipped() {
        let (fetcher, _probe, mut client) = setup();
        fetcher.fail(&item_url(1), 500);
        fetcher.respond(&item_url(2), "null");
        let source = CancelSource::new();

        let items = expect_items(assert_ok!(client.fetch_all(&request(true), &source.token()).await));

        let ids: Vec<_> = items.iter().map(|i| i.id().unwrap()).collect();
        assert_eq!(ids, vec![3]);
    }

    #[tokio::test]
    async fn test_undecodable_item_is_skipped() {
        let (fetcher, _probe, mut client) = setup();
        fetcher.respond(&item_url(3), "{not json");
        let source = CancelSource::new();

        let items = expect_items(assert_ok!(client.fetch_all(&request(true), &source.token()).await));
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_max_items_caps_fan_out() {
        let (fetcher, _probe, mut client) = setup();
        let source = CancelSource::new();
        let mut req = request(true);
        req.max_items = 2;

        let items = expect_items(assert_ok!(client.fetch_all(&req, &source.token()).await));

        assert_eq!(items.len(), 2);
        assert_eq!(fetcher.calls_to(&item_url(2)), 0);
    }

    #[tokio::test]
    async fn test_empty_listing_reports_no_items() {
        let (fetcher, _probe, mut client) = setup();
        fetcher.respond(LISTING, "[]");
        let source = CancelSource::new();

        let err = assert_err!(client.fetch_all(&request(true), &source.token()).await);
        assert!(matches!(err, TickerError::NoItems));
        assert_eq!(client.last_max_id(), 0, "failed cycle does not advance the max id");
    }

    #[tokio::test]
    async fn test_listing_http_error_aborts_cycle() {
        let (fetcher, _probe, mut client) = setup();
        fetcher.fail(LISTING, 503);
        let source = CancelSource::new();

        let err = assert_err!(client.fetch_all(&request(true), &source.token()).await);
        assert!(matches!(err, TickerError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_bad_max_item_body() {
        let (fetcher, _probe, mut client) = setup();
        fetcher.respond(&format!("{BASE}/maxitem.json"), "<html>");
        let source = CancelSource::new();

        let err = assert_err!(client.fetch_all(&request(true), &source.token()).await);
        assert!(matches!(err, TickerError::IdList(_)));
    }

    #[tokio::test]
    async fn test_offline_fails_before_any_request() {
        let (fetcher, probe, mut client) = setup();
        probe.set(false);
        let source = CancelSource::new();

        let err = assert_err!(client.fetch_all(&request(true), &source.token()).await);
        assert!(matches!(err, TickerError::NetworkUnavailable(_)));
        assert_eq!(fetcher.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_mid_batch_discards_partial_results() {
        let (fetcher, _probe, client) = setup();
        fetcher.hang(&item_url(1));
        let source = CancelSource::new();
        let token = source.token();

        let handle = tokio::spawn(async move {
            let mut client = client;
            let result = client.fetch_all(&request(true), &token).await;
            (client, result)
        });

        while fetcher.calls_to(&item_url(1)) == 0 {
            tokio::task::yield_now().await;
        }
        source.cancel();

        let (client, result) = handle.await.unwrap();
        assert!(assert_err!(result).is_cancelled());
        assert_eq!(client.last_max_id(), 0);
    }

    #[tokio::test]
    async fn test_cache_cleared_once_over_limit() {
        let (fetcher, _probe, client) = setup();
        let mut client = client.with_cache(ItemCache::with_limit(2));
        let source = CancelSource::new();

        assert_ok!(client.fetch_all(&request(true), &source.token()).await);
        assert_eq!(client.cache().len(), 3);

        fetcher.respond(LISTING, "[]");
        assert_err!(client.fetch_all(&request(true), &source.token()).await);
        assert!(client.cache().is_empty(), "next cycle starts from an empty cache");

        fetcher.respond(LISTING, "[3,1,2]");
        assert_ok!(client.fetch_all(&request(true), &source.token()).await);
        assert_eq!(fetcher.calls_to(&item_url(3)), 2);
    }
}
