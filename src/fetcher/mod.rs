pub mod http_fetcher;

use async_trait::async_trait;

use crate::app::Result;

/// Fetches a feed document's raw bytes.
///
/// A trait seam so the poller can be driven from canned documents in tests.
#[async_trait]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}
