use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::ContentItem;

/// Entries kept before the whole cache is dropped.
pub const DEFAULT_CACHE_LIMIT: usize = 5000;

/// Item cache for the tree API, keyed by item id.
///
/// Growth is unbounded until the size exceeds the limit; the next cycle then
/// clears every entry at once. There is no recency tracking, so a hot item
/// is evicted along with everything else and simply fetched again.
#[derive(Debug)]
pub struct ItemCache {
    items: HashMap<i64, Arc<ContentItem>>,
    limit: usize,
}

impl ItemCache {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_CACHE_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            items: HashMap::new(),
            limit,
        }
    }

    pub fn get(&self, id: i64) -> Option<Arc<ContentItem>> {
        self.items.get(&id).cloned()
    }

    pub fn insert(&mut self, id: i64, item: Arc<ContentItem>) {
        self.items.insert(id, item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Called at the start of a cycle only. Returns whether a clear happened.
    pub fn clear_if_over_limit(&mut self) -> bool {
        if self.items.len() > self.limit {
            tracing::debug!("Item cache at {} entries, clearing", self.items.len());
            self.items.clear();
            true
        } else {
            false
        }
    }
}

impl Default for ItemCache {
    fn default() -> Self {
        Self::new()
    }
}
