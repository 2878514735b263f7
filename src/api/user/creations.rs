//! Creation history and likes

use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiOutcome, ApiResult, Json};
use crate::domain::{Creation, CreationId};

#[derive(Debug, Serialize)]
pub struct CreationsPayload {
    pub creations: Vec<Creation>,
}

/// `id` may be sent as a number or a numeric string
#[derive(Debug, Deserialize, Validate)]
pub struct ToggleLikeRequest {
    pub id: CreationId,
}

#[derive(Debug, Serialize)]
pub struct MessagePayload {
    pub message: &'static str,
}

pub async fn get_user_creations(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> ApiResult<CreationsPayload> {
    let creations = state.creations.list_user_creations(&user).await?;

    Ok(ApiOutcome::Ok(CreationsPayload { creations }))
}

pub async fn get_published_creations(
    State(state): State<AppState>,
    RequireUser(_user): RequireUser,
) -> ApiResult<CreationsPayload> {
    let creations = state.creations.list_published().await?;

    Ok(ApiOutcome::Ok(CreationsPayload { creations }))
}

pub async fn toggle_like_creations(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<ToggleLikeRequest>,
) -> ApiResult<MessagePayload> {
    let toggle = state.creations.toggle_like(&user, body.id).await?;

    Ok(ApiOutcome::Ok(MessagePayload {
        message: toggle.message(),
    }))
}
