//! Front door for consumers: one active [`TickerService`] at a time.
//!
//! The coordinator re-publishes the active service's events and item
//! snapshots on its own channels, so subscribers survive a source switch.
//! Configuration changes go through `&mut self` and are applied in order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::app::{Result, TickerError};
use crate::domain::ContentItem;
use crate::service::{ItemsSnapshot, ServiceRegistry, SourceInfo, TickerEvent, TickerService};
use crate::source::Category;

const EVENT_CAPACITY: usize = 16;

/// Initial selection handed to [`ContentCoordinator::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub source: usize,
    pub category: usize,
    pub interval: Duration,
    pub logging: bool,
}

pub struct ContentCoordinator {
    registry: ServiceRegistry,
    service: Option<TickerService>,
    forwarder: Option<JoinHandle<()>>,
    events: broadcast::Sender<TickerEvent>,
    items: watch::Sender<Arc<ItemsSnapshot>>,
    has_new_items: Arc<AtomicBool>,
    selection: Selection,
}

impl ContentCoordinator {
    /// Create the service for `selection` and start refreshing. Must be
    /// called from within a tokio runtime.
    pub fn start(registry: ServiceRegistry, selection: Selection) -> Result<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (items, _) = watch::channel(Arc::new(ItemsSnapshot::default()));

        let mut coordinator = Self {
            registry,
            service: None,
            forwarder: None,
            events,
            items,
            has_new_items: Arc::new(AtomicBool::new(false)),
            selection,
        };
        coordinator.install(selection)?;
        Ok(coordinator)
    }

    fn install(&mut self, selection: Selection) -> Result<()> {
        let service = self.registry.create_service_with_category(
            selection.source,
            selection.category,
            selection.logging,
        )?;
        service.start_refreshing(selection.interval, selection.category)?;

        self.teardown();
        self.items.send_replace(service.snapshot());
        self.has_new_items.store(false, Ordering::Release);
        self.forwarder = Some(self.forward(&service));
        self.service = Some(service);
        self.selection = selection;
        Ok(())
    }

    fn teardown(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
        if let Some(service) = self.service.take() {
            service.stop_refreshing();
        }
    }

    fn forward(&self, service: &TickerService) -> JoinHandle<()> {
        let mut upstream = service.subscribe();
        let snapshots = service.subscribe_items();
        let events = self.events.clone();
        let items = self.items.clone();
        let has_new_items = self.has_new_items.clone();

        tokio::spawn(async move {
            loop {
                let event = match upstream.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Coordinator lagged, {} events skipped", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                if let TickerEvent::RefreshCompleted { has_new_items: found } = event {
                    let snapshot = snapshots.borrow().clone();
                    items.send_replace(snapshot);
                    has_new_items.store(found, Ordering::Release);
                }
                let _ = events.send(event);
            }
        })
    }

    fn service(&self) -> Result<&TickerService> {
        self.service.as_ref().ok_or(TickerError::NotStarted)
    }

    pub fn source(&self) -> usize {
        self.selection.source
    }

    pub fn category(&self) -> usize {
        self.selection.category
    }

    pub fn refresh_interval(&self) -> Duration {
        self.selection.interval
    }

    pub fn logging_enabled(&self) -> bool {
        self.selection.logging
    }

    pub fn is_refreshing(&self) -> bool {
        self.service.as_ref().is_some_and(TickerService::is_refreshing)
    }

    pub fn last_error(&self) -> Option<String> {
        self.service.as_ref().and_then(TickerService::last_error)
    }

    pub fn items(&self) -> Arc<ItemsSnapshot> {
        self.items.borrow().clone()
    }

    pub fn current_items(&self) -> Vec<Arc<ContentItem>> {
        self.items.borrow().current.clone()
    }

    pub fn new_items(&self) -> Vec<Arc<ContentItem>> {
        self.items.borrow().new.clone()
    }

    /// Whether the last completed cycle found anything new.
    pub fn has_new_items(&self) -> bool {
        self.has_new_items.load(Ordering::Acquire)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TickerEvent> {
        self.events.subscribe()
    }

    pub fn watch_items(&self) -> watch::Receiver<Arc<ItemsSnapshot>> {
        self.items.subscribe()
    }

    pub fn sources(&self) -> Vec<SourceInfo> {
        self.registry.sources()
    }

    /// Categories of the active source.
    pub fn categories(&self) -> Result<&'static [Category]> {
        self.registry.categories(self.selection.source)
    }

    /// Replace the active service. Interval carries over; the old service is
    /// stopped only once the new one is built. Same source is a no-op.
    pub fn change_current_service(
        &mut self,
        source: usize,
        category: usize,
        enable_logging: bool,
    ) -> Result<()> {
        if self.service.is_some() && source == self.selection.source {
            return Ok(());
        }

        info!("Switching to source {} (category {})", source, category);
        self.install(Selection {
            source,
            category,
            logging: enable_logging,
            ..self.selection
        })
    }

    pub fn change_current_category(&mut self, category: usize) -> Result<()> {
        if category == self.selection.category {
            return Ok(());
        }
        self.service()?.change_content_category(category)?;
        self.selection.category = category;
        Ok(())
    }

    pub fn change_refresh_interval(&mut self, interval: Duration) -> Result<()> {
        if interval == self.selection.interval {
            return Ok(());
        }
        self.service()?.change_desired_refresh_interval(interval)?;
        self.selection.interval = interval;
        Ok(())
    }

    pub fn set_logging(&mut self, enabled: bool) {
        if enabled == self.selection.logging {
            return;
        }
        self.selection.logging = enabled;
        if let Some(service) = &self.service {
            service.change_logging(enabled);
        }
    }

    pub fn pause(&self) -> Result<()> {
        self.service()?.pause_refreshing();
        Ok(())
    }

    pub fn resume(&self) -> Result<()> {
        self.service()?.resume_refreshing();
        Ok(())
    }

    /// Run one cycle now. `None` if a cycle was already in flight.
    pub async fn refresh_now(&self) -> Result<Option<bool>> {
        let service = self.service()?;
        let outcome = service.refresh_now().await;

        if let Some(found) = outcome {
            self.items.send_replace(service.snapshot());
            self.has_new_items.store(found, Ordering::Release);
        }
        Ok(outcome)
    }

    /// Stop refreshing and release the service. Later calls that need a
    /// service fail with `NotStarted`.
    pub fn close(&mut self) {
        self.teardown();
        info!("Coordinator closed");
    }
}

impl Drop for ContentCoordinator {
    fn drop(&mut self) {
        self.teardown();
    }
}
