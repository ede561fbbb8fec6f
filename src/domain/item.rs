use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Dedup identity of a [`ContentItem`].
///
/// Tree-API sources carry a stable numeric id. Feed sources have none, so
/// their identity is a digest of the normalised headline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemKey {
    Id(i64),
    Headline(String),
}

/// A fetched headline. Built once by a source client, read-only afterwards.
#[derive(Debug, Clone)]
pub struct ContentItem {
    key: ItemKey,
    id: Option<i64>,
    headline: String,
    summary: Option<String>,
    created_at: DateTime<Utc>,
    link: Option<String>,
    secondary_link: Option<String>,
    sub_item_ids: Vec<i64>,
}

impl ContentItem {
    /// An item identified by its headline text.
    pub fn new(headline: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        let headline = headline.into();
        let key = ItemKey::Headline(Self::headline_key(&headline));
        Self::build(key, None, headline, created_at)
    }

    /// An item identified by a stable numeric id.
    pub fn with_id(id: i64, headline: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self::build(ItemKey::Id(id), Some(id), headline.into(), created_at)
    }

    fn build(
        key: ItemKey,
        id: Option<i64>,
        headline: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            id,
            headline,
            summary: None,
            created_at,
            link: None,
            secondary_link: None,
            sub_item_ids: Vec::new(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_secondary_link(mut self, link: impl Into<String>) -> Self {
        self.secondary_link = Some(link.into());
        self
    }

    pub fn with_sub_items(mut self, ids: Vec<i64>) -> Self {
        self.sub_item_ids = ids;
        self
    }

    /// Collapse whitespace runs and trim, so cosmetic differences in feed
    /// markup do not produce distinct identities.
    pub fn normalize_headline(headline: &str) -> String {
        headline.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Deterministic identity for id-less items.
    pub fn headline_key(headline: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(Self::normalize_headline(headline).as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn key(&self) -> &ItemKey {
        &self.key
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn headline(&self) -> &str {
        &self.headline
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn has_summary(&self) -> bool {
        self.summary.is_some()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    pub fn has_link(&self) -> bool {
        self.link.is_some()
    }

    pub fn secondary_link(&self) -> Option<&str> {
        self.secondary_link.as_deref()
    }

    pub fn sub_item_ids(&self) -> &[i64] {
        &self.sub_item_ids
    }

    pub fn has_sub_items(&self) -> bool {
        !self.sub_item_ids.is_empty()
    }
}

impl PartialEq for ContentItem {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ContentItem {}

impl Hash for ContentItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}
