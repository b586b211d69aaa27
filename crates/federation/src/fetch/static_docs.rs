//! In-memory fetcher for pre-bundled documents.
use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

use super::{FetchError, Fetcher};

#[derive(Default)]
struct Documents {
    bodies: HashMap<String, Vec<u8>>,
    requests: HashMap<String, usize>,
}

/// Serves documents registered up front, keyed by absolute URL.
///
/// Every request is counted, including requests for unknown URLs, so callers
/// can assert how often the network would have been hit.
#[derive(Default)]
pub struct StaticFetcher {
    documents: Mutex<Documents>,
    latency: Option<Duration>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn insert(&self, url: &Url, body: impl Into<Vec<u8>>) {
        self.documents
            .lock()
            .bodies
            .insert(url.to_string(), body.into());
    }

    pub fn remove(&self, url: &Url) -> Option<Vec<u8>> {
        self.documents.lock().bodies.remove(url.as_str())
    }

    /// Number of requests issued for `url` so far.
    pub fn request_count(&self, url: &Url) -> usize {
        self.documents
            .lock()
            .requests
            .get(url.as_str())
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let body = {
            let mut documents = self.documents.lock();
            *documents.requests.entry(url.to_string()).or_default() += 1;
            documents.bodies.get(url.as_str()).cloned()
        };

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        body.ok_or_else(|| FetchError::NotFound(url.to_string()))
    }
}
