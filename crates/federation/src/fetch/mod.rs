//! Network boundary for manifests and remote entries.
//!
//! Everything the federation layer reads from another deployment goes through
//! a [`Fetcher`]. [`DefaultFetcher`] speaks `http(s)` via reqwest and `file`
//! for local deployments; [`StaticFetcher`] serves pre-bundled documents from
//! memory and counts requests.

mod http;
mod static_docs;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

pub use http::DefaultFetcher;
pub use static_docs::StaticFetcher;

/// Errors surfaced by fetcher implementations.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server responded with status {0}")]
    Status(u16),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("no document at {0}")]
    NotFound(String),
}

/// Reads the raw bytes behind a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

/// Outcome of a fetch bounded by a timeout.
#[derive(Debug)]
pub(crate) enum FetchFailure {
    Failed(FetchError),
    TimedOut,
}

pub(crate) async fn fetch_with_timeout(
    fetcher: &dyn Fetcher,
    url: &Url,
    timeout: Duration,
) -> Result<Vec<u8>, FetchFailure> {
    match tokio::time::timeout(timeout, fetcher.fetch(url)).await {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(err)) => Err(FetchFailure::Failed(err)),
        Err(_) => Err(FetchFailure::TimedOut),
    }
}
