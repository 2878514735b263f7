//! History, likes and usage endpoints under `/api/user`

mod creations;
mod usage;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

pub fn create_user_router() -> Router<AppState> {
    Router::new()
        .route("/get-user-creations", get(creations::get_user_creations))
        .route("/get-published-creations", get(creations::get_published_creations))
        .route("/toggle-like-creations", post(creations::toggle_like_creations))
        .route("/get-usage-data", get(usage::get_usage_data))
}
