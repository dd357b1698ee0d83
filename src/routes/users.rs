use crate::users::{Credentials, UserDto};
use crate::{AppError, AppState};
use axum::{Json, extract::State, http::StatusCode};

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserDto>>, AppError> {
    crate::metrics::inc_requests("/api/users");
    Ok(Json(state.users.list().await?))
}

/// Creates an account. Also mounted at `POST /api/users`.
///
/// - Method: `POST`
/// - Path: `/api/users/register`
/// - Body: `{ "username", "password" }`
/// - Response: 201 `{ id, username }`, 409 when the name is taken
pub async fn register(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<(StatusCode, Json<UserDto>), AppError> {
    crate::metrics::inc_requests("/api/users/register");
    let user = state.users.register(credentials).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<UserDto>, AppError> {
    crate::metrics::inc_requests("/api/users/login");
    Ok(Json(state.users.login(credentials).await?))
}
