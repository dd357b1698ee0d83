use crate::catalog::CatalogEntry;
use crate::valuation::{PriceSource, SearchQuery, ValueOutcome, estimate};
use crate::{AppError, AppState};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

#[derive(Debug, Deserialize)]
pub struct GameSearchParams {
    #[serde(default)]
    term: String,
}

#[derive(Debug, Deserialize)]
pub struct ValueParams {
    #[serde(default)]
    title: String,
    #[serde(default)]
    platform: Option<String>,
}

/// Body of both value endpoints. A miss keeps `estimatedPrice: null` so
/// clients can tell it apart from an error body.
#[skip_serializing_none]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueResponse {
    pub message: String,
    #[serialize_always]
    pub estimated_price: Option<Decimal>,
    pub sample_size: Option<usize>,
    pub source: Option<&'static str>,
}

impl ValueResponse {
    pub fn from_outcome(outcome: ValueOutcome) -> (StatusCode, Self) {
        match outcome {
            ValueOutcome::Estimated(estimate) => (
                StatusCode::OK,
                Self {
                    message: "Value successfully estimated from recent sales.".into(),
                    estimated_price: Some(estimate.estimated_price),
                    sample_size: Some(estimate.sample_size),
                    source: Some(estimate.source),
                },
            ),
            ValueOutcome::NotFound(reason) => (
                StatusCode::NOT_FOUND,
                Self {
                    message: reason.message().into(),
                    estimated_price: None,
                    sample_size: None,
                    source: None,
                },
            ),
        }
    }
}

/// Catalog search by title.
///
/// - Method: `GET`
/// - Path: `/api/externaldata/search/games?term=`
pub async fn search_games(
    State(state): State<AppState>,
    Query(params): Query<GameSearchParams>,
) -> Result<Json<Vec<CatalogEntry>>, AppError> {
    crate::metrics::inc_requests("/api/externaldata/search/games");
    let entries = state.catalog.search(&params.term).await?;
    Ok(Json(entries))
}

async fn respond_with_estimate(
    source: &dyn PriceSource,
    params: ValueParams,
) -> Result<Response, AppError> {
    let query = SearchQuery::new(&params.title, params.platform.as_deref())?;
    let (status, body) = ValueResponse::from_outcome(estimate(source, &query).await?);
    Ok((status, Json(body)).into_response())
}

/// Resale value from the marketplace's completed-items API.
///
/// - Method: `GET`
/// - Path: `/api/externaldata/value?title=&platform=`
/// - Response: 200 with an estimate, 404 when no sold prices were found
pub async fn value(
    State(state): State<AppState>,
    Query(params): Query<ValueParams>,
) -> Result<Response, AppError> {
    crate::metrics::inc_requests("/api/externaldata/value");
    respond_with_estimate(state.value_api.as_ref(), params).await
}

/// Resale value read from the rendered sold-listings page.
///
/// - Method: `GET`
/// - Path: `/api/externaldata/value-agent?title=&platform=`
pub async fn value_agent(
    State(state): State<AppState>,
    Query(params): Query<ValueParams>,
) -> Result<Response, AppError> {
    crate::metrics::inc_requests("/api/externaldata/value-agent");
    respond_with_estimate(state.value_agent.as_ref(), params).await
}
