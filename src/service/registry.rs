use std::sync::Arc;

use tracing::debug;

use crate::app::Result;
use crate::fetcher::reachability::ReachabilityGate;
use crate::fetcher::Fetcher;
use crate::logging::LogSwitch;
use crate::service::ticker::TickerService;
use crate::source::{Category, SourceKind};

/// Builds the [`TickerService`] for a source index and describes the
/// catalogue. Holds no service itself; the caller owns what it creates.
#[derive(Clone)]
pub struct ServiceRegistry {
    fetcher: Arc<dyn Fetcher>,
    reachability: Arc<ReachabilityGate>,
    log_switch: LogSwitch,
}

/// One catalogue entry, for listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub index: usize,
    pub name: &'static str,
    pub categories: Vec<&'static str>,
}

impl ServiceRegistry {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        reachability: Arc<ReachabilityGate>,
        log_switch: LogSwitch,
    ) -> Self {
        Self {
            fetcher,
            reachability,
            log_switch,
        }
    }

    /// Fails with `SourceOutOfRange` for an unknown index.
    pub fn create_service(&self, source: usize, enable_logging: bool) -> Result<TickerService> {
        self.create_service_with_category(source, 0, enable_logging)
    }

    pub fn create_service_with_category(
        &self,
        source: usize,
        category: usize,
        enable_logging: bool,
    ) -> Result<TickerService> {
        let kind = SourceKind::from_index(source)?;
        let client = kind.client(self.fetcher.clone(), self.reachability.clone());
        let service = TickerService::new(kind, client, category, self.log_switch.clone())?;

        // The switch is process-wide; a rejected request leaves it alone.
        self.log_switch.set_enabled(enable_logging);
        debug!("Created service for {}", kind.name());
        Ok(service)
    }

    pub fn sources(&self) -> Vec<SourceInfo> {
        SourceKind::ALL
            .iter()
            .map(|kind| SourceInfo {
                index: kind.index(),
                name: kind.name(),
                categories: kind.categories().iter().map(|c| c.label).collect(),
            })
            .collect()
    }

    pub fn categories(&self, source: usize) -> Result<&'static [Category]> {
        Ok(SourceKind::from_index(source)?.categories())
    }
}
