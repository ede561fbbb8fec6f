use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use feed_rs::parser;
use html_escape::decode_html_entities;

use crate::app::{Result, TickerError};
use crate::domain::ContentItem;

/// Which entry timestamp a feed source treats as the creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampField {
    Published,
    Updated,
}

/// Per-source mapping from a syndication entry to a [`ContentItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedMapping {
    pub timestamp: TimestampField,
    pub with_summary: bool,
}

impl FeedMapping {
    pub const fn published_with_summary() -> Self {
        Self {
            timestamp: TimestampField::Published,
            with_summary: true,
        }
    }

    pub const fn updated_headline_only() -> Self {
        Self {
            timestamp: TimestampField::Updated,
            with_summary: false,
        }
    }
}

#[derive(Clone, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Parse a full RSS/Atom document. Entries keep document order.
    pub fn normalize(
        &self,
        body: &[u8],
        mapping: FeedMapping,
        fetched_at: DateTime<Utc>,
    ) -> Result<Vec<ContentItem>> {
        let feed = parser::parse(body).map_err(|e| TickerError::FeedParse(e.to_string()))?;

        let items = feed
            .entries
            .into_iter()
            .map(|entry| Self::to_item(entry, mapping, fetched_at))
            .collect();

        Ok(items)
    }

    fn to_item(entry: Entry, mapping: FeedMapping, fetched_at: DateTime<Utc>) -> ContentItem {
        let headline = entry
            .title
            .map(|t| decode_html_entities(&t.content).to_string())
            .unwrap_or_else(|| "(Untitled)".to_string());

        let (preferred, fallback) = match mapping.timestamp {
            TimestampField::Published => (entry.published, entry.updated),
            TimestampField::Updated => (entry.updated, entry.published),
        };
        let created_at = preferred
            .or(fallback)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(fetched_at);

        let mut item = ContentItem::new(headline, created_at);

        if let Some(link) = entry.links.into_iter().next() {
            item = item.with_link(link.href);
        }

        if mapping.with_summary {
            if let Some(summary) = entry.summary {
                item = item.with_summary(decode_html_entities(&summary.content).to_string());
            }
        }

        item
    }
}
