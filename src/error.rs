use thiserror::Error;

use crate::record::Dimension;

/// A single field failed normalization. Row-local: the row is skipped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("no recognizable date in {0:?}")]
    Date(String),
    #[error("empty category cell")]
    Category,
    #[error("empty manufacturer cell")]
    Manufacturer,
    #[error("no numeric content in {0:?}")]
    Count(String),
    #[error("row has {found} cells, need at least {needed}")]
    Shape { found: usize, needed: usize },
}

/// A source could not be fetched or did not return a usable document.
/// Triggers the next fallback; never fatal on its own.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("{url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },
    #[error("{0} is unavailable")]
    Unavailable(String),
}

/// Failures that surface from a refresh: nothing could be produced for a
/// dimension, or storage rejected the batch.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("every source for {0} data was exhausted, synthetic floor included")]
    Exhausted(Dimension),
    #[error("synthetic generator misconfigured: {0}")]
    Synthetic(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_error_names_construction() {
        let inner = reqwest::Client::new().get("not a url").build().unwrap_err();
        let msg = SourceError::Client(inner).to_string();
        assert!(msg.starts_with("failed to build HTTP client"));
        assert!(!msg.contains("request to"));
    }
}
