mod catalog;
mod collection;
mod error;
mod http;
mod metrics;
mod models;
mod routes;
mod store;
mod users;
mod valuation;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use catalog::{CatalogClient, CatalogError, config::CatalogConfig};
use collection::{CollectionService, models::EnumCasing};
use error::{ErrorKind, ServiceError};
use eyre::WrapErr;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use models::ApiError;
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use store::Store;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use users::{UserError, UserService};
use valuation::{
    PriceSource, ValuationError,
    config::{BrowserSettings, FindingConfig, ScrapeConfig},
    finding::FindingApiSource,
    render::ChromiumRenderer,
    scrape::SoldListingsScraper,
};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!(target = "media.api", "server crashed: {err:?}");
    }
}

async fn run() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let casing = EnumCasing::from_env();
    let store = Store::from_env(casing)
        .await
        .wrap_err("failed to open the collection store")?;
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .wrap_err("failed to install the prometheus recorder")?;

    let catalog_config = CatalogConfig::from_env();
    if !catalog_config.has_credentials() {
        warn!(
            target = "media.api",
            "IGDB credentials missing; game search will fail upstream"
        );
    }

    let state = AppState {
        catalog: Arc::new(CatalogClient::new(catalog_config)),
        value_api: Arc::new(FindingApiSource::new(FindingConfig::from_env())),
        value_agent: Arc::new(SoldListingsScraper::new(
            ChromiumRenderer::new(BrowserSettings::from_env()),
            ScrapeConfig::from_env(),
        )),
        collection: CollectionService::new(store.clone(), casing),
        users: UserService::new(store),
        openapi: Arc::new(load_openapi()),
        prometheus_handle,
    };

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8000);
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    info!(target = "media.api", "listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state).into_make_service()).await?;
    Ok(())
}

#[derive(Clone)]
struct AppState {
    catalog: Arc<CatalogClient>,
    value_api: Arc<dyn PriceSource>,
    value_agent: Arc<dyn PriceSource>,
    collection: CollectionService,
    users: UserService,
    openapi: Arc<serde_json::Value>,
    prometheus_handle: PrometheusHandle,
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/openapi.json", get(openapi_json))
        .route("/docs", get(swagger_ui))
        .merge(routes::api_routes())
        .with_state(state)
        .layer(cors_from_env())
        .layer(TraceLayer::new_for_http())
        .layer(axum::extract::DefaultBodyLimit::max(body_limit_from_env()))
}

fn load_openapi() -> serde_json::Value {
    serde_yaml::from_str(include_str!("../docs/openapi.yaml"))
        .unwrap_or_else(|_| json!({"openapi": "3.0.3"}))
}

/// `CORS_ALLOWED_ORIGINS` is a comma separated list; unset allows any origin.
fn cors_from_env() -> CorsLayer {
    let cors = CorsLayer::new().allow_headers(Any).allow_methods(Any);
    let origins: Vec<HeaderValue> = std::env::var("CORS_ALLOWED_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

/// Health and readiness check.
///
/// - Method: `GET`
/// - Path: `/health`
/// - Auth: none
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "media-collection-api-rs",
    }))
}

async fn openapi_json(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    if let Ok(key) = std::env::var("OPENAPI_KEY") {
        let presented = headers
            .get("X-Docs-Key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if presented != key {
            return Err(ServiceError::unauthorized("docs", "unauthorized").into());
        }
    }
    Ok(Json((*state.openapi).clone()))
}

async fn swagger_ui() -> Response {
    let html = r#"<!doctype html>
<html>
<head>
  <meta charset='utf-8'/>
  <title>Media Collection API Docs</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.onload = () => {
      window.ui = SwaggerUIBundle({ url: '/openapi.json', dom_id: '#swagger-ui' });
    };
  </script>
</body>
</html>"#;
    (
        [(axum::http::header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
        .into_response()
}

fn body_limit_from_env() -> usize {
    std::env::var("REQUEST_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(256 * 1024)
}

async fn metrics_endpoint(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> Response {
    if let Ok(secret) = std::env::var("METRICS_KEY") {
        let presented = headers
            .get("X-Metrics-Key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if presented != secret {
            return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
        }
    }
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4",
        )],
        state.prometheus_handle.render(),
    )
        .into_response()
}

#[derive(Debug)]
struct AppError(ServiceError);

impl From<ServiceError> for AppError {
    fn from(value: ServiceError) -> Self {
        Self(value)
    }
}

impl From<CatalogError> for AppError {
    fn from(value: CatalogError) -> Self {
        Self(value.into())
    }
}

impl From<ValuationError> for AppError {
    fn from(value: ValuationError) -> Self {
        Self(value.into())
    }
}

impl From<UserError> for AppError {
    fn from(value: UserError) -> Self {
        Self(value.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = match err.kind() {
            ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::UpstreamAuth | ErrorKind::UpstreamQuery => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(target = "media.api", error = %err, "request_failed");
        }
        let payload = ApiError {
            error: err.scope().to_string(),
            detail: Some(err.detail().to_string()),
        };
        (status, Json(payload)).into_response()
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let _ = fmt().with_env_filter(filter).try_init();
}
