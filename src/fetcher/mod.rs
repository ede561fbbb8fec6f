pub mod cancel;
pub mod http_fetcher;
pub mod reachability;

#[cfg(test)]
pub(crate) mod stub;

use async_trait::async_trait;

use crate::app::Result;

pub use cancel::{CancelSource, CancelToken};

/// Plain HTTP GET transport shared by every source client.
///
/// Implementations return the full response body on a 2xx status and a
/// [`TickerError::Status`](crate::app::TickerError::Status) otherwise.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}
