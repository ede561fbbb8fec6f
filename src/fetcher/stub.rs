//! In-memory transport doubles for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::app::{Result, TickerError};
use crate::fetcher::reachability::Reachability;
use crate::fetcher::Fetcher;

#[derive(Debug, Clone)]
pub enum StubResponse {
    Body(Vec<u8>),
    Status(u16),
    /// Body delivered after a tokio sleep, so paused-clock tests control it.
    Delayed(Duration, Vec<u8>),
    /// Never completes; only cancellation gets the caller out.
    Hang,
}

#[derive(Default)]
pub struct StubFetcher {
    responses: Mutex<HashMap<String, StubResponse>>,
    calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), StubResponse::Body(body.into()));
    }

    pub fn fail(&self, url: &str, status: u16) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), StubResponse::Status(status));
    }

    pub fn respond_after(&self, url: &str, delay: Duration, body: impl Into<Vec<u8>>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), StubResponse::Delayed(delay, body.into()));
    }

    pub fn hang(&self, url: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), StubResponse::Hang);
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(url.to_string());
        let response = self.responses.lock().unwrap().get(url).cloned();

        match response {
            Some(StubResponse::Body(body)) => Ok(body),
            Some(StubResponse::Status(status)) => Err(TickerError::Status {
                status,
                reason: "Stubbed".into(),
            }),
            Some(StubResponse::Delayed(delay, body)) => {
                tokio::time::sleep(delay).await;
                Ok(body)
            }
            Some(StubResponse::Hang) => std::future::pending().await,
            None => Err(TickerError::Status {
                status: 404,
                reason: "Not Found".into(),
            }),
        }
    }
}

pub struct StaticReachability {
    online: AtomicBool,
    probes: AtomicUsize,
}

impl StaticReachability {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
            probes: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Reachability for StaticReachability {
    async fn is_reachable(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.online.load(Ordering::SeqCst)
    }
}
