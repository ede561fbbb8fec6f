//! # newsticker
//!
//! A polling headline ticker: periodically pulls items from Hacker News,
//! Reddit, BBC News and Ars Technica and keeps a deduplicated view of the
//! current items plus the ones that are new since the last refresh.
//!
//! ## Architecture
//!
//! ```text
//! RefreshTimer → TickerService → SourceClient → Fetcher
//!                      ↓
//!                 merge → ItemsSnapshot → ContentCoordinator → consumer
//! ```
//!
//! - [`source`]: per-source clients (bulk feeds and the Hacker News tree API)
//! - [`service`]: the polling state machine, dedup merge and registry
//! - [`coordinator`]: the façade that owns the active service
//!
//! ## Quick Start
//!
//! ```bash
//! # List sources and categories
//! newsticker sources
//!
//! # One refresh of BBC News / Technology
//! newsticker fetch --source 2 --category 2
//!
//! # Keep watching Hacker News, refreshing every two minutes
//! newsticker watch --source 0 --interval 2m
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the fetcher,
/// the reachability gate and the service registry.
pub mod app;

/// Command-line interface using clap.
///
/// - `sources` - List sources and categories
/// - `fetch` - Run one refresh and print the items
/// - `watch` - Refresh on a schedule and print new items
pub mod cli;

/// Configuration loaded from `~/.config/newsticker/config.toml`.
pub mod config;

/// [`ContentCoordinator`](coordinator::ContentCoordinator): one active
/// service, re-published events, source switching.
pub mod coordinator;

/// Core domain model: [`ContentItem`](domain::ContentItem) and its identity.
pub mod domain;

/// HTTP fetching, reachability checks and per-cycle cancellation.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for HTTP GET
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
/// - [`ReachabilityGate`](fetcher::reachability::ReachabilityGate): fail fast when offline
pub mod fetcher;

/// Tracing subscriber setup and the runtime logging switch.
pub mod logging;

/// Feed parsing and normalization.
///
/// Converts RSS and Atom documents into [`ContentItem`](domain::ContentItem)s.
pub mod normalizer;

/// Refresh scheduling, dedup merge and service construction.
pub mod service;

/// Source catalogue and source clients.
pub mod source;
