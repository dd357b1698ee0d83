//! Game metadata lookup against the IGDB catalog.
//!
//! Every search authenticates with the client-credentials grant (cached until
//! shortly before expiry), posts an Apicalypse query and rewrites cover URLs
//! from the thumbnail rendition to the large cover rendition.

pub mod auth;
pub mod config;

use crate::error::ServiceError;
use crate::http::build_client;
use auth::{CatalogAuthError, TokenCache};
use config::CatalogConfig;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub const RESULT_LIMIT: usize = 20;
const THUMBNAIL_TOKEN: &str = "t_thumb";
const FULL_SIZE_TOKEN: &str = "t_cover_big";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("search term cannot be empty")]
    EmptyTerm,
    #[error(transparent)]
    Auth(#[from] CatalogAuthError),
    #[error("catalog query failed: {0}")]
    Query(String),
}

impl From<CatalogError> for ServiceError {
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::EmptyTerm => {
                ServiceError::invalid_argument("catalog", "Search term cannot be empty.")
            }
            CatalogError::Auth(err) => ServiceError::upstream_auth("catalog", err.to_string()),
            CatalogError::Query(msg) => ServiceError::upstream_query("catalog", msg),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct IgdbGame {
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    cover: Option<IgdbCover>,
    #[serde(default)]
    first_release_date: Option<i64>,
    #[serde(default)]
    platforms: Vec<IgdbPlatform>,
}

#[derive(Debug, Clone, Deserialize)]
struct IgdbCover {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct IgdbPlatform {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: u64,
    pub title: String,
    pub cover_url: Option<String>,
    pub first_release_date: Option<i64>,
    pub platforms: Vec<String>,
}

impl From<IgdbGame> for CatalogEntry {
    fn from(game: IgdbGame) -> Self {
        Self {
            id: game.id,
            title: game.name,
            cover_url: game
                .cover
                .and_then(|cover| cover.url)
                .map(|url| full_size_cover(&url)),
            first_release_date: game.first_release_date,
            platforms: game
                .platforms
                .into_iter()
                .filter_map(|platform| platform.name)
                .collect(),
        }
    }
}

pub struct CatalogClient {
    http: Client,
    config: CatalogConfig,
    tokens: TokenCache,
}

impl CatalogClient {
    pub fn new(config: CatalogConfig) -> Self {
        Self::with_client(config, build_client())
    }

    pub fn with_client(config: CatalogConfig, http: Client) -> Self {
        Self {
            http,
            config,
            tokens: TokenCache::new(),
        }
    }

    pub async fn search(&self, term: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(CatalogError::EmptyTerm);
        }

        let token = self.tokens.access_token(&self.http, &self.config).await?;
        let response = self
            .http
            .post(self.config.games_url())
            .header("Client-ID", &self.config.client_id)
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(search_query(term))
            .send()
            .await
            .map_err(|err| CatalogError::Query(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!(target = "media.catalog", "catalog_token_rejected");
            self.tokens.invalidate().await;
        }
        if !status.is_success() {
            return Err(CatalogError::Query(format!("HTTP {status}")));
        }

        let games: Vec<IgdbGame> = response
            .json()
            .await
            .map_err(|err| CatalogError::Query(err.to_string()))?;
        info!(
            target = "media.catalog",
            term = %term,
            results = games.len(),
            "catalog_search_completed"
        );
        Ok(games.into_iter().map(CatalogEntry::from).collect())
    }
}

fn search_query(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        "search \"{escaped}\"; fields name, cover.url, first_release_date, platforms.name; limit {RESULT_LIMIT};"
    )
}

pub fn full_size_cover(url: &str) -> String {
    url.replace(THUMBNAIL_TOKEN, FULL_SIZE_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::State,
        http::{HeaderMap, StatusCode},
        routing::post,
    };
    use serde_json::json;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[derive(Clone, Default)]
    struct Upstream {
        token_calls: Arc<AtomicUsize>,
        query_calls: Arc<AtomicUsize>,
        reject_token: bool,
        reject_query: bool,
        last_body: Arc<std::sync::Mutex<String>>,
    }

    async fn token(State(up): State<Upstream>) -> (StatusCode, Json<serde_json::Value>) {
        up.token_calls.fetch_add(1, Ordering::SeqCst);
        if up.reject_token {
            return (StatusCode::BAD_REQUEST, Json(json!({"message": "invalid client"})));
        }
        (
            StatusCode::OK,
            Json(json!({"access_token": "tok-1", "expires_in": 3600, "token_type": "bearer"})),
        )
    }

    async fn games(
        State(up): State<Upstream>,
        headers: HeaderMap,
        body: String,
    ) -> (StatusCode, Json<serde_json::Value>) {
        up.query_calls.fetch_add(1, Ordering::SeqCst);
        *up.last_body.lock().unwrap() = body;
        if up.reject_query {
            return (StatusCode::UNAUTHORIZED, Json(json!([])));
        }
        assert_eq!(headers.get("Client-ID").unwrap(), "client");
        assert_eq!(headers.get("Authorization").unwrap(), "Bearer tok-1");
        (
            StatusCode::OK,
            Json(json!([
                {
                    "id": 1,
                    "name": "Chrono Trigger",
                    "cover": {"url": "//images.igdb.com/igdb/image/upload/t_thumb/co1.jpg"},
                    "first_release_date": 794966400,
                    "platforms": [{"name": "SNES"}, {"name": "Nintendo DS"}]
                },
                {"id": 2, "name": "Chrono Cross"}
            ])),
        )
    }

    async fn spawn_upstream(up: Upstream) -> CatalogConfig {
        let app = Router::new()
            .route("/oauth2/token", post(token))
            .route("/v4/games", post(games))
            .with_state(up);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        CatalogConfig {
            client_id: "client".into(),
            client_secret: "secret".into(),
            token_url: format!("http://{addr}/oauth2/token"),
            api_url: format!("http://{addr}/v4"),
        }
    }

    #[tokio::test]
    async fn blank_terms_fail_before_any_request() {
        let up = Upstream::default();
        let config = spawn_upstream(up.clone()).await;
        let client = CatalogClient::with_client(config, Client::new());
        for term in ["", "   "] {
            let err = client.search(term).await.unwrap_err();
            assert!(matches!(err, CatalogError::EmptyTerm));
        }
        assert_eq!(up.token_calls.load(Ordering::SeqCst), 0);
        assert_eq!(up.query_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn search_rewrites_covers_and_keeps_missing_ones() {
        let up = Upstream::default();
        let config = spawn_upstream(up.clone()).await;
        let client = CatalogClient::with_client(config, Client::new());
        let entries = client.search("chrono").await.expect("search");
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].cover_url.as_deref(),
            Some("//images.igdb.com/igdb/image/upload/t_cover_big/co1.jpg")
        );
        assert_eq!(entries[0].platforms, vec!["SNES", "Nintendo DS"]);
        assert_eq!(entries[0].first_release_date, Some(794966400));
        assert_eq!(entries[1].cover_url, None);
        assert!(entries[1].platforms.is_empty());

        let body = up.last_body.lock().unwrap().clone();
        assert!(body.starts_with("search \"chrono\";"));
        assert!(body.ends_with("limit 20;"));
    }

    #[tokio::test]
    async fn token_is_reused_until_expiry() {
        let up = Upstream::default();
        let config = spawn_upstream(up.clone()).await;
        let client = CatalogClient::with_client(config, Client::new());
        client.search("zelda").await.expect("first");
        client.search("metroid").await.expect("second");
        assert_eq!(up.token_calls.load(Ordering::SeqCst), 1);
        assert_eq!(up.query_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn token_rejection_is_an_auth_error() {
        let up = Upstream {
            reject_token: true,
            ..Upstream::default()
        };
        let config = spawn_upstream(up.clone()).await;
        let client = CatalogClient::with_client(config, Client::new());
        let err = client.search("zelda").await.unwrap_err();
        assert!(matches!(err, CatalogError::Auth(CatalogAuthError::Request(_))));
        assert_eq!(up.query_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn query_rejection_is_a_query_error_and_evicts_token() {
        let up = Upstream {
            reject_query: true,
            ..Upstream::default()
        };
        let config = spawn_upstream(up.clone()).await;
        let client = CatalogClient::with_client(config, Client::new());
        let err = client.search("zelda").await.unwrap_err();
        assert!(matches!(err, CatalogError::Query(_)));
        client.search("zelda").await.unwrap_err();
        assert_eq!(up.token_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_credentials_is_an_auth_error() {
        let config = CatalogConfig {
            client_id: String::new(),
            client_secret: String::new(),
            token_url: "http://127.0.0.1:9/token".into(),
            api_url: "http://127.0.0.1:9".into(),
        };
        let client = CatalogClient::with_client(config, Client::new());
        let err = client.search("zelda").await.unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Auth(CatalogAuthError::MissingCredentials)
        ));
    }

    #[test]
    fn quotes_in_terms_are_escaped() {
        let query = search_query(r#"say "hi" \o/"#);
        assert!(query.starts_with(r#"search "say \"hi\" \\o/";"#));
    }

    #[test]
    fn cover_without_thumbnail_token_is_unchanged() {
        let url = "//images.igdb.com/igdb/image/upload/t_720p/co1.jpg";
        assert_eq!(full_size_cover(url), url);
    }
}
