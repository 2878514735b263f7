//! Text generation endpoints

use axum::extract::State;
use serde::Deserialize;
use tracing::debug;
use validator::Validate;

use super::{respond, FeatureContent, UsageLeftField};
use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiResult, Json};

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateArticleRequest {
    #[validate(length(min = 1, message = "Prompt is required"))]
    pub prompt: String,
    #[validate(range(min = 1, message = "Length must be a positive number"))]
    pub length: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateBlogTitleRequest {
    #[validate(length(min = 1, message = "Prompt is required"))]
    pub prompt: String,
}

pub async fn generate_article(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<GenerateArticleRequest>,
) -> ApiResult<FeatureContent> {
    debug!(user_id = %user.user_id, length = body.length, "Generating article");

    let outcome = state
        .features
        .generate_article(&user, &body.prompt, body.length)
        .await?;

    Ok(respond(outcome, UsageLeftField::Omit))
}

pub async fn generate_blog_title(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<GenerateBlogTitleRequest>,
) -> ApiResult<FeatureContent> {
    let outcome = state.features.generate_blog_title(&user, &body.prompt).await?;

    Ok(respond(outcome, UsageLeftField::Omit))
}
