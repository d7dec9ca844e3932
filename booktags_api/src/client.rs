//! HTTP client for tag listing and item detail pages.

use std::time::Duration;

use reqwest::header::USER_AGENT;
use url::Url;

use crate::{user_agent::Identity, FetchFailure};

/// Production site root.
pub const DEFAULT_BASE_URL: &str = "https://book.douban.com";

/// Upper bound on a single network read.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// A successfully read page.
#[derive(Debug, Clone)]
pub struct RawPage {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// HTTP client for the listing site.
///
/// Holds one `reqwest::Client` with the configured timeout. Headers are not
/// baked into the client; every call supplies the [`Identity`] to present.
pub struct Client {
    base_url: String,
    http: reqwest::Client,
}

impl Client {
    /// Creates a client pointing at the production site.
    pub fn new() -> Result<Self, FetchFailure> {
        Self::with_base_url(DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom base URL and timeout. Used for mirrors
    /// and for testing with wiremock.
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, FetchFailure> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds `{base}/tag/{topic}?start={start}` with the topic
    /// percent-encoded as a single path segment.
    pub fn tag_url(&self, topic: &str, start: u32) -> Result<Url, FetchFailure> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| {
                FetchFailure::InvalidUrl(format!("{} cannot be a base url", self.base_url))
            })?
            .pop_if_empty()
            .push("tag")
            .push(topic);
        url.query_pairs_mut()
            .append_pair("start", &start.to_string());
        Ok(url)
    }

    /// Performs one GET. Non-success statuses, timeouts and transport
    /// errors all come back as [`FetchFailure`]; nothing is retried here.
    pub async fn fetch(&self, url: &str, identity: &Identity) -> Result<RawPage, FetchFailure> {
        let mut request = self
            .http
            .get(url)
            .header(USER_AGENT, identity.user_agent.as_str());
        for (name, value) in &identity.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let resp = request.send().await.map_err(|e| {
            tracing::debug!("GET {} failed: {}", url, e);
            FetchFailure::from(e)
        })?;

        let status = resp.status();
        if !status.is_success() {
            tracing::debug!("GET {} returned {}", url, status);
            return Err(FetchFailure::Status {
                status: status.as_u16(),
            });
        }

        let final_url = resp.url().to_string();
        let body = resp.text().await?;
        Ok(RawPage {
            url: final_url,
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> Client {
        Client::with_base_url(base, DEFAULT_TIMEOUT).unwrap()
    }

    #[test]
    fn tag_url_ascii_topic() {
        let url = client(DEFAULT_BASE_URL).tag_url("python", 40).unwrap();
        assert_eq!(url.as_str(), "https://book.douban.com/tag/python?start=40");
    }

    #[test]
    fn tag_url_encodes_non_ascii_topic() {
        let url = client(DEFAULT_BASE_URL).tag_url("心理", 0).unwrap();
        assert_eq!(
            url.as_str(),
            "https://book.douban.com/tag/%E5%BF%83%E7%90%86?start=0"
        );
    }

    #[test]
    fn tag_url_encodes_separators_inside_topic() {
        let url = client(DEFAULT_BASE_URL).tag_url("c/c++ primer", 20).unwrap();
        assert_eq!(
            url.as_str(),
            "https://book.douban.com/tag/c%2Fc++%20primer?start=20"
        );
    }

    #[test]
    fn tag_url_trailing_slash_base() {
        let url = client("http://127.0.0.1:8080/").tag_url("x", 0).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/tag/x?start=0");
    }

    #[test]
    fn tag_url_keeps_base_path() {
        let url = client("http://mirror.local/books").tag_url("x", 0).unwrap();
        assert_eq!(url.as_str(), "http://mirror.local/books/tag/x?start=0");
    }

    #[test]
    fn tag_url_invalid_base() {
        let result = client("not a url").tag_url("x", 0);
        assert!(matches!(result, Err(FetchFailure::InvalidUrl(_))));
    }
}
