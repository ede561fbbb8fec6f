//! Connectivity pre-check run before a source issues any request.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};

use crate::app::{Result, TickerError};

pub const DEFAULT_PROBE_TARGETS: [&str; 2] = ["1.1.1.1:53", "8.8.8.8:53"];
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_PROBE_TTL: Duration = Duration::from_secs(60);

#[async_trait]
pub trait Reachability: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// Opens a TCP connection to well-known public resolvers; any success means
/// the Internet is reachable.
pub struct InternetProbe {
    targets: Vec<SocketAddr>,
    timeout: Duration,
}

impl InternetProbe {
    pub fn new(targets: Vec<SocketAddr>, timeout: Duration) -> Self {
        Self { targets, timeout }
    }
}

impl Default for InternetProbe {
    fn default() -> Self {
        let targets = DEFAULT_PROBE_TARGETS
            .iter()
            .filter_map(|t| t.parse().ok())
            .collect();
        Self::new(targets, DEFAULT_PROBE_TIMEOUT)
    }
}

#[async_trait]
impl Reachability for InternetProbe {
    async fn is_reachable(&self) -> bool {
        for target in &self.targets {
            match timeout(self.timeout, TcpStream::connect(target)).await {
                Ok(Ok(_)) => return true,
                Ok(Err(e)) => tracing::debug!("Probe {} failed: {}", target, e),
                Err(_) => tracing::debug!("Probe {} timed out", target),
            }
        }
        false
    }
}

/// Caches a positive probe for `ttl`; a negative result is re-probed on
/// every call.
pub struct ReachabilityGate {
    probe: Arc<dyn Reachability>,
    ttl: Duration,
    last_ok: Mutex<Option<Instant>>,
}

impl ReachabilityGate {
    pub fn new(probe: Arc<dyn Reachability>) -> Self {
        Self::with_ttl(probe, DEFAULT_PROBE_TTL)
    }

    pub fn with_ttl(probe: Arc<dyn Reachability>, ttl: Duration) -> Self {
        Self {
            probe,
            ttl,
            last_ok: Mutex::new(None),
        }
    }

    pub async fn ensure_online(&self) -> Result<()> {
        let cached = *self.last_ok.lock().unwrap_or_else(PoisonError::into_inner);
        if cached.is_some_and(|at| at.elapsed() < self.ttl) {
            return Ok(());
        }

        let online = self.probe.is_reachable().await;
        *self.last_ok.lock().unwrap_or_else(PoisonError::into_inner) =
            online.then(Instant::now);

        if online {
            Ok(())
        } else {
            tracing::error!("No Internet access");
            Err(TickerError::NetworkUnavailable("No Internet access".into()))
        }
    }
}
