use std::sync::Arc;
use std::time::Duration;

use crate::app::error::Result;
use crate::config::Config;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::reachability::{InternetProbe, Reachability, ReachabilityGate};
use crate::fetcher::Fetcher;
use crate::logging::LogSwitch;
use crate::service::ServiceRegistry;

pub struct AppContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub reachability: Arc<ReachabilityGate>,
    pub registry: ServiceRegistry,
    pub log_switch: LogSwitch,
}

impl AppContext {
    pub fn new(config: &Config, log_switch: LogSwitch) -> Result<Self> {
        let network = &config.network;
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::with_settings(
            Duration::from_secs(network.timeout_secs),
            &network.user_agent,
        )?);
        let probe: Arc<dyn Reachability> = Arc::new(InternetProbe::new(
            network.probe_addrs()?,
            Duration::from_millis(network.probe_timeout_ms),
        ));
        let reachability = Arc::new(ReachabilityGate::with_ttl(
            probe,
            Duration::from_secs(network.probe_ttl_secs),
        ));

        Ok(Self::with_parts(fetcher, reachability, log_switch))
    }

    pub fn with_parts(
        fetcher: Arc<dyn Fetcher>,
        reachability: Arc<ReachabilityGate>,
        log_switch: LogSwitch,
    ) -> Self {
        let registry =
            ServiceRegistry::new(fetcher.clone(), reachability.clone(), log_switch.clone());

        Self {
            fetcher,
            reachability,
            registry,
            log_switch,
        }
    }
}
