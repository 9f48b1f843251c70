use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use tracing::debug;

use crate::error::SourceError;

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Anything that can hand back a report document for a URL.
#[allow(async_fn_in_trait)]
pub trait DocumentSource {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, SourceError>;
}

/// Live HTTP source. The dashboard rejects obvious bots, so requests carry
/// browser-like headers.
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new() -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(SourceError::Client)?;
        Ok(HttpSource { client })
    }
}

impl DocumentSource for HttpSource {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, SourceError> {
        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status { url: url.to_string(), status: status.as_u16() });
        }

        let body = response.text().await.map_err(|e| classify(url, timeout, e))?;
        debug!("Fetched {} ({} bytes) in {}ms", url, body.len(), start.elapsed().as_millis());
        Ok(body)
    }
}

fn classify(url: &str, timeout: Duration, e: reqwest::Error) -> SourceError {
    if e.is_timeout() {
        SourceError::Timeout { url: url.to_string(), secs: timeout.as_secs() }
    } else {
        SourceError::Request { url: url.to_string(), source: e }
    }
}
