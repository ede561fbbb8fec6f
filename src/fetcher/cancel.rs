//! Per-cycle cancellation.
//!
//! A [`CancelSource`] is created for every refresh cycle and handed out as
//! cheap [`CancelToken`] clones to the source client. Dropping the source
//! counts as cancellation, so a token can never outlive its cycle silently.

use std::future::Future;

use tokio::sync::watch;

use crate::app::{Result, TickerError};

#[derive(Debug)]
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once the owning [`CancelSource`] is cancelled or dropped.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Drive `fut` to completion unless the token fires first.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_cancelled() {
            return Err(TickerError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(TickerError::Cancelled),
            result = fut => result,
        }
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(TickerError::Cancelled)
        } else {
            Ok(())
        }
    }
}
