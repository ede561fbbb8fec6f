//! Source clients and the catalogue of known sources.
//!
//! Every source is one [`SourceKind`]. The kind knows the source's base
//! address, its categories and how to build the locator for a category;
//! the matching [`SourceClient`] does the network work.

pub mod cache;
pub mod hacker_news;
pub mod id_array;
pub mod rss;

use std::sync::Arc;

use async_trait::async_trait;

use crate::app::{Result, TickerError};
use crate::domain::ContentItem;
use crate::fetcher::reachability::ReachabilityGate;
use crate::fetcher::{CancelToken, Fetcher};
use crate::normalizer::FeedMapping;

pub use hacker_news::HackerNewsClient;
pub use rss::RssClient;

/// Items per cycle. Feeds never return more than this anyway.
pub const MAX_ITEMS: usize = 50;

/// Inputs for a single fetch cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Full URL for the selected category.
    pub locator: String,
    pub max_items: usize,
    /// Skip any "nothing changed" shortcut the client has.
    pub force: bool,
}

#[derive(Debug)]
pub enum Fetched {
    /// The source reported nothing new; the previous items still stand.
    Unchanged,
    Items(Vec<Arc<ContentItem>>),
}

#[async_trait]
pub trait SourceClient: Send {
    fn max_items(&self) -> usize;

    async fn fetch_all(&mut self, request: &FetchRequest, cancel: &CancelToken) -> Result<Fetched>;
}

/// A selectable sub-feed of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub label: &'static str,
    pub path: &'static str,
}

const fn category(label: &'static str, path: &'static str) -> Category {
    Category { label, path }
}

const HACKER_NEWS_CATEGORIES: &[Category] = &[
    category("Front page", "topstories"),
    category("Newest items", "newstories"),
    category("Best items", "beststories"),
    category("Ask HN", "askstories"),
    category("Show HN", "showstories"),
    category("Jobs", "jobstories"),
];

const REDDIT_CATEGORIES: &[Category] = &[
    category("dotnetdeveloper", "/user/Alavan/m/dotnetdeveloper"),
    category("Front page", ""),
];

const BBC_CATEGORIES: &[Category] = &[
    category("Top Stories", "/news"),
    category("World", "/news/world"),
    category("Technology", "/news/technology"),
    category("Science & Environment", "/news/science_and_environment"),
    category("Europe", "/news/world/europe"),
    category("UK", "/news/uk"),
    category("US & Canada", "/news/world/us_and_canada"),
    category("Latin America", "/news/world/latin_america"),
    category("Asia", "/news/world/asia"),
    category("Africa", "/news/world/africa"),
];

const ARS_TECHNICA_CATEGORIES: &[Category] = &[category("All stories", "/arstechnica/index")];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    HackerNews,
    Reddit,
    BbcNews,
    ArsTechnica,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::HackerNews,
        SourceKind::Reddit,
        SourceKind::BbcNews,
        SourceKind::ArsTechnica,
    ];

    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(TickerError::SourceOutOfRange {
                index,
                max: Self::ALL.len() - 1,
            })
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            SourceKind::HackerNews => "Hacker News",
            SourceKind::Reddit => "Reddit",
            SourceKind::BbcNews => "BBC News",
            SourceKind::ArsTechnica => "Ars Technica",
        }
    }

    pub fn base_url(self) -> &'static str {
        match self {
            SourceKind::HackerNews => "https://hacker-news.firebaseio.com/v0",
            SourceKind::Reddit => "https://www.reddit.com",
            SourceKind::BbcNews => "https://feeds.bbci.co.uk",
            SourceKind::ArsTechnica => "https://feeds.arstechnica.com",
        }
    }

    /// Appended after the category path for feed sources.
    fn feed_tail(self) -> &'static str {
        match self {
            SourceKind::Reddit => "/new/.rss?sort=new",
            SourceKind::BbcNews => "/rss.xml",
            SourceKind::HackerNews | SourceKind::ArsTechnica => "",
        }
    }

    pub fn categories(self) -> &'static [Category] {
        match self {
            SourceKind::HackerNews => HACKER_NEWS_CATEGORIES,
            SourceKind::Reddit => REDDIT_CATEGORIES,
            SourceKind::BbcNews => BBC_CATEGORIES,
            SourceKind::ArsTechnica => ARS_TECHNICA_CATEGORIES,
        }
    }

    pub fn max_category(self) -> usize {
        self.categories().len() - 1
    }

    pub fn feed_mapping(self) -> Option<FeedMapping> {
        match self {
            SourceKind::HackerNews => None,
            SourceKind::Reddit => Some(FeedMapping::updated_headline_only()),
            SourceKind::BbcNews | SourceKind::ArsTechnica => {
                Some(FeedMapping::published_with_summary())
            }
        }
    }

    /// Full URL of the resource backing `category`.
    pub fn locator(self, category: usize) -> Result<String> {
        let entry = self
            .categories()
            .get(category)
            .ok_or(TickerError::CategoryOutOfRange {
                category,
                max: self.max_category(),
            })?;

        let raw = match self {
            SourceKind::HackerNews => format!("{}/{}.json", self.base_url(), entry.path),
            _ => format!("{}{}{}", self.base_url(), entry.path, self.feed_tail()),
        };

        Ok(url::Url::parse(&raw)?.to_string())
    }

    pub fn client(
        self,
        fetcher: Arc<dyn Fetcher>,
        reachability: Arc<ReachabilityGate>,
    ) -> Box<dyn SourceClient> {
        match self.feed_mapping() {
            None => Box::new(HackerNewsClient::new(self.base_url(), fetcher, reachability)),
            Some(mapping) => Box::new(RssClient::new(self.name(), mapping, fetcher, reachability)),
        }
    }
}
