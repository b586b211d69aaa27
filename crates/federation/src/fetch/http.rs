//! reqwest / filesystem fetcher.
use async_trait::async_trait;
use url::Url;

use super::{FetchError, Fetcher};

/// Fetcher for `http`, `https`, and `file` URLs.
#[derive(Clone, Default)]
pub struct DefaultFetcher {
    /// HTTP client
    http_client: reqwest::Client,
}

impl DefaultFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxies, default headers, TLS roots).
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl Fetcher for DefaultFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        match url.scheme() {
            "http" | "https" => {
                tracing::debug!("GET {}", url);
                let response = self.http_client.get(url.clone()).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(FetchError::Status(status.as_u16()));
                }
                Ok(response.bytes().await?.to_vec())
            }
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| FetchError::NotFound(url.to_string()))?;
                tracing::debug!("Reading {}", path.display());
                Ok(tokio::fs::read(path).await?)
            }
            other => Err(FetchError::UnsupportedScheme(other.to_string())),
        }
    }
}
