//! Product catalogue backend.
use std::sync::Arc;

use federation::{DefaultFetcher, FetchError, Fetcher};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::state::ProductItem;

/// Public product listing used when no other endpoint is configured.
pub const DEFAULT_PRODUCTS_URL: &str = "https://dummyjson.com/products";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Error while fetching products: {0}")]
    Fetch(#[from] FetchError),

    #[error("Error while fetching products: malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid products URL '{0}'")]
    InvalidUrl(String),
}

/// One page of the product listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductListResponse {
    pub products: Vec<ProductItem>,
    pub limit: u64,
    pub skip: u64,
    pub total: u64,
}

/// Reads product listings through a [`Fetcher`].
#[derive(Clone)]
pub struct ProductService {
    fetcher: Arc<dyn Fetcher>,
    url: Url,
}

impl ProductService {
    pub fn new(fetcher: Arc<dyn Fetcher>, url: Url) -> Self {
        Self { fetcher, url }
    }

    /// Service against [`DEFAULT_PRODUCTS_URL`] over HTTP.
    pub fn public() -> Result<Self, ServiceError> {
        let url = Url::parse(DEFAULT_PRODUCTS_URL)
            .map_err(|_| ServiceError::InvalidUrl(DEFAULT_PRODUCTS_URL.to_string()))?;
        Ok(Self::new(Arc::new(DefaultFetcher::new()), url))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub async fn get_product_list(&self) -> Result<ProductListResponse, ServiceError> {
        let body = self.fetcher.fetch(&self.url).await?;
        let response: ProductListResponse = serde_json::from_slice(&body)?;
        tracing::debug!(
            "Fetched {} of {} products from {}",
            response.products.len(),
            response.total,
            self.url
        );
        Ok(response)
    }
}

impl std::fmt::Debug for ProductService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductService")
            .field("url", &self.url.as_str())
            .finish_non_exhaustive()
    }
}
