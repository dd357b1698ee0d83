use crate::catalog::config::CatalogConfig;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

/// Tokens are refreshed this long before the expiry the token endpoint reports.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum CatalogAuthError {
    #[error("missing catalog client credentials in env")]
    MissingCredentials,
    #[error("oauth request failed: {0}")]
    Request(String),
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Client-credentials token source with an expiry-aware cache.
///
/// Concurrent callers serialize on the cache lock; the first one refreshes.
#[derive(Default)]
pub struct TokenCache {
    slot: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn access_token(
        &self,
        http: &Client,
        config: &CatalogConfig,
    ) -> Result<String, CatalogAuthError> {
        if !config.has_credentials() {
            return Err(CatalogAuthError::MissingCredentials);
        }

        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref().filter(|c| Instant::now() < c.expires_at) {
            return Ok(cached.value.clone());
        }

        let fresh = request_token(http, config).await?;
        let lifetime = Duration::from_secs(fresh.expires_in).saturating_sub(EXPIRY_MARGIN);
        debug!(
            target = "media.catalog",
            expires_in = fresh.expires_in,
            "catalog_token_refreshed"
        );
        *slot = Some(CachedToken {
            value: fresh.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(fresh.access_token)
    }

    pub async fn invalidate(&self) {
        self.slot.lock().await.take();
    }
}

async fn request_token(
    http: &Client,
    config: &CatalogConfig,
) -> Result<TokenResponse, CatalogAuthError> {
    let response = http
        .post(config.token_url.as_str())
        .query(&[
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("grant_type", "client_credentials"),
        ])
        .send()
        .await
        .map_err(|err| CatalogAuthError::Request(err.to_string()))?;

    if !response.status().is_success() {
        return Err(CatalogAuthError::Request(format!(
            "HTTP {}",
            response.status()
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|err| CatalogAuthError::Request(err.to_string()))
}
