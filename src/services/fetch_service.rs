use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};

use crate::errors::{FeedgenError, FeedgenResult};

/// A fetched page and the URL it was finally served from, after redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub html: String,
    pub final_url: String,
}

#[cfg_attr(test, mockall::automock)]
pub trait Fetcher: Send + Sync {
    /// GET `url` with extra request headers. Network and HTTP failures are `FeedgenError::Fetch`.
    fn fetch(&self, url: &str, headers: &[(String, String)]) -> FeedgenResult<FetchedPage>;
}

pub struct HttpFetcher {
    client: Client,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> FeedgenResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
        })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, headers: &[(String, String)]) -> FeedgenResult<FetchedPage> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .headers(header_map(headers)?)
            .send()
            .map_err(|e| FeedgenError::Fetch(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedgenError::Fetch(format!("{} returned HTTP {}", url, status)));
        }

        let final_url = response.url().to_string();
        let html = response
            .text()
            .map_err(|e| FeedgenError::Fetch(format!("{}: {}", url, e)))?;

        tracing::debug!(url, final_url = %final_url, bytes = html.len(), "Fetched page");
        Ok(FetchedPage { html, final_url })
    }
}

fn header_map(headers: &[(String, String)]) -> FeedgenResult<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| FeedgenError::Fetch(format!("invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| FeedgenError::Fetch(format!("invalid header value for '{}': {}", name.as_str(), e)))?;
        map.insert(name, value);
    }
    Ok(map)
}
