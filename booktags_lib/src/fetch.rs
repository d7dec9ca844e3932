//! The page-fetching seam between the crawler and the transport.

use async_trait::async_trait;
use booktags_api::{Client, FetchFailure, Identity, RawPage};

/// One network read per call, no retries.
///
/// The crawler only talks to this trait, so tests can script responses
/// without a server.
#[async_trait]
pub trait PageFetch: Send + Sync {
    /// URL of the listing page starting at item offset `start`.
    fn listing_url(&self, topic: &str, start: u32) -> Result<String, FetchFailure>;

    async fn fetch(&self, url: &str, identity: &Identity) -> Result<RawPage, FetchFailure>;
}

#[async_trait]
impl PageFetch for Client {
    fn listing_url(&self, topic: &str, start: u32) -> Result<String, FetchFailure> {
        self.tag_url(topic, start).map(|url| url.to_string())
    }

    async fn fetch(&self, url: &str, identity: &Identity) -> Result<RawPage, FetchFailure> {
        Client::fetch(self, url, identity).await
    }
}
