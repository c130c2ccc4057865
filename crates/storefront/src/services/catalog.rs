//! Product catalog API client.
//!
//! The catalog is the source of truth for product data; the cart only ever
//! snapshots `name`/`price`/`image_url` onto new line items. Responses are
//! cached in-memory via `moka` for five minutes, matching how often catalog
//! prices are allowed to be stale inside a session.

use std::time::Duration;

use moka::future::Cache;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use mangaba_core::{Money, ProductId};

use crate::config::CatalogConfig;

/// How long a product snapshot may be served from cache.
const CACHE_TTL: Duration = Duration::from_secs(300);

/// Upper bound on cached products.
const CACHE_CAPACITY: u64 = 10_000;

/// Errors that can occur when interacting with the catalog API.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// Product does not exist in the catalog.
    #[error("Product not found: {0}")]
    NotFound(String),

    /// Failed to parse a response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Product data snapshotted onto a new line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    /// Display name.
    pub name: String,
    /// Current catalog price.
    pub price: Money,
    /// Primary product image.
    pub image_url: Option<String>,
}

/// Read access to the product catalog.
pub trait ProductCatalog: Send + Sync {
    /// Fetch the current snapshot for a product.
    async fn product(&self, id: &ProductId) -> Result<ProductSnapshot, CatalogError>;
}

#[derive(Debug, Deserialize)]
struct ProductResponse {
    name: String,
    price: rust_decimal::Decimal,
    image_url: Option<String>,
}

/// Catalog API client with a short-lived in-memory cache.
#[derive(Clone)]
pub struct HttpCatalogClient {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<ProductId, ProductSnapshot>,
}

impl HttpCatalogClient {
    /// Create a new catalog API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| CatalogError::Parse(format!("Invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let cache = Cache::builder()
            .time_to_live(CACHE_TTL)
            .max_capacity(CACHE_CAPACITY)
            .build();

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            cache,
        })
    }

    async fn fetch(&self, id: &ProductId) -> Result<ProductSnapshot, CatalogError> {
        let url = format!(
            "{}/products/{}",
            self.base_url,
            urlencoding::encode(id.as_str())
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(id.to_string()));
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ProductResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        Ok(ProductSnapshot {
            name: body.name,
            price: Money::new(body.price),
            image_url: body.image_url,
        })
    }
}

impl ProductCatalog for HttpCatalogClient {
    async fn product(&self, id: &ProductId) -> Result<ProductSnapshot, CatalogError> {
        if let Some(hit) = self.cache.get(id).await {
            return Ok(hit);
        }

        let snapshot = self.fetch(id).await?;
        self.cache.insert(id.clone(), snapshot.clone()).await;
        Ok(snapshot)
    }
}
