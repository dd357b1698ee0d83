pub mod external;
pub mod media;
pub mod users;

use crate::AppState;
use axum::{
    Router,
    routing::{get, patch, post},
};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/externaldata/search/games", get(external::search_games))
        .route("/api/externaldata/value", get(external::value))
        .route("/api/externaldata/value-agent", get(external::value_agent))
        .route(
            "/api/mediaitems",
            get(media::list_items).post(media::create_item),
        )
        .route("/api/mediaitems/stats", get(media::stats))
        .route("/api/mediaitems/platforms", get(media::platforms))
        .route("/api/mediaitems/genres", get(media::genres))
        .route(
            "/api/mediaitems/{id}",
            get(media::get_item)
                .put(media::update_item)
                .delete(media::delete_item),
        )
        .route("/api/mediaitems/{id}/price", patch(media::update_price))
        .route(
            "/api/users",
            get(users::list_users).post(users::register),
        )
        .route("/api/users/register", post(users::register))
        .route("/api/users/login", post(users::login))
}
