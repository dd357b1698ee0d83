use crate::collection::dto::{
    CollectionStatsDto, CreateMediaItem, MediaItemDto, PriceUpdated, UpdateMediaItem, UpdatePrice,
};
use crate::collection::query::ListParams;
use crate::{AppError, AppState};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use uuid::Uuid;

/// Filtered, sorted page of items. Paging totals travel in headers.
///
/// - Method: `GET`
/// - Path: `/api/mediaitems`
/// - Query: `mediaType`, `platform`, `status`, `isFavorite`, `searchTerm`,
///   `sortBy`, `descending`, `page`, `pageSize`
pub async fn list_items(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    crate::metrics::inc_requests("/api/mediaitems");
    let page = state.collection.list(params).await?;
    let headers = [
        ("X-Total-Count", page.total.to_string()),
        ("X-Page", page.page.to_string()),
        ("X-Page-Size", page.page_size.to_string()),
    ];
    Ok((headers, Json(page.items)))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MediaItemDto>, AppError> {
    crate::metrics::inc_requests("/api/mediaitems/{id}");
    Ok(Json(state.collection.get(id).await?))
}

pub async fn create_item(
    State(state): State<AppState>,
    Json(input): Json<CreateMediaItem>,
) -> Result<impl IntoResponse, AppError> {
    crate::metrics::inc_requests("/api/mediaitems");
    let created = state.collection.create(input).await?;
    let location = format!("/api/mediaitems/{}", created.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(created),
    ))
}

pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateMediaItem>,
) -> Result<StatusCode, AppError> {
    crate::metrics::inc_requests("/api/mediaitems/{id}");
    state.collection.update(id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    crate::metrics::inc_requests("/api/mediaitems/{id}");
    state.collection.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_price(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdatePrice>,
) -> Result<Json<PriceUpdated>, AppError> {
    crate::metrics::inc_requests("/api/mediaitems/{id}/price");
    Ok(Json(state.collection.update_price(id, input.price).await?))
}

/// Totals over owned items, grouped by media type.
pub async fn stats(State(state): State<AppState>) -> Result<Json<CollectionStatsDto>, AppError> {
    crate::metrics::inc_requests("/api/mediaitems/stats");
    Ok(Json(state.collection.stats().await?))
}

pub async fn platforms(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    crate::metrics::inc_requests("/api/mediaitems/platforms");
    Ok(Json(state.collection.platforms().await?))
}

pub async fn genres(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    crate::metrics::inc_requests("/api/mediaitems/genres");
    Ok(Json(state.collection.genres().await?))
}
