//! Shop catalog feed
//!
//! Read-only pass-through of the upstream item shop. The raw document is
//! cached for a fixed TTL; when a refresh fails the last good copy keeps
//! being served.

mod normalize;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;

pub use normalize::{normalize, CatalogItem};

/// Error type for catalog fetches.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("Upstream returned {status}")]
    Upstream { status: u16 },

    /// The HTTP client could not be built.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

#[derive(Debug, Clone)]
struct CachedCatalog {
    payload: Arc<Value>,
    fetched_at: Instant,
}

/// Cached client for the upstream shop endpoint.
#[derive(Debug)]
pub struct CatalogClient {
    http: Client,
    url: String,
    api_key: Option<String>,
    ttl: Duration,
    cache: RwLock<Option<CachedCatalog>>,
}

impl CatalogClient {
    pub fn new(
        url: impl Into<String>,
        api_key: Option<String>,
        ttl: Duration,
    ) -> Result<Self, CatalogError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| CatalogError::Configuration(e.to_string()))?;

        Ok(Self {
            http,
            url: url.into(),
            api_key,
            ttl,
            cache: RwLock::new(None),
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current catalog document, fetched again once the cached copy is older than the TTL.
    pub async fn snapshot(&self) -> Result<Arc<Value>, CatalogError> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(cached.payload.clone());
            }
        }

        match self.refresh().await {
            Ok(payload) => Ok(payload),
            Err(err) => match self.cache.read().await.as_ref() {
                Some(stale) => {
                    tracing::warn!(error = %err, "Catalog refresh failed, serving stale copy");
                    Ok(stale.payload.clone())
                }
                None => Err(err),
            },
        }
    }

    /// Normalized items of the current catalog
    pub async fn items(&self) -> Result<Vec<CatalogItem>, CatalogError> {
        let document = self.snapshot().await?;
        Ok(normalize(&document))
    }

    /// Fetch unconditionally and replace the cached copy
    pub async fn refresh(&self) -> Result<Arc<Value>, CatalogError> {
        let payload = Arc::new(self.fetch().await?);

        *self.cache.write().await = Some(CachedCatalog {
            payload: payload.clone(),
            fetched_at: Instant::now(),
        });

        tracing::debug!(url = %self.url, "Catalog refreshed");
        Ok(payload)
    }

    async fn fetch(&self) -> Result<Value, CatalogError> {
        let mut request = self.http.get(&self.url);
        if let Some(key) = &self.api_key {
            request = request.query(&[("apiKey", key)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Upstream {
                status: status.as_u16(),
            });
        }

        Ok(response.json::<Value>().await?)
    }
}
