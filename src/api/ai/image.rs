//! Image generation and image-effect endpoints

use axum::extract::{multipart::MultipartRejection, Multipart, State};
use serde::Deserialize;
use validator::Validate;

use super::{respond, FeatureContent, UploadForm, UsageLeftField};
use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiResult, Json};

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateImageRequest {
    #[validate(length(min = 1, message = "Prompt is required"))]
    pub prompt: String,
    #[serde(default)]
    pub publish: bool,
}

pub async fn generate_image(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<GenerateImageRequest>,
) -> ApiResult<FeatureContent> {
    let outcome = state
        .features
        .generate_image(&user, &body.prompt, body.publish)
        .await?;

    Ok(respond(outcome, UsageLeftField::Omit))
}

/// multipart: `image`
pub async fn remove_image_background(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<FeatureContent> {
    let mut form = UploadForm::read(multipart).await?;
    let image = form.take_file("image")?;

    let outcome = state.features.remove_background(&user, image).await?;

    Ok(respond(outcome, UsageLeftField::Include))
}

/// multipart: `image`, `object`
pub async fn remove_image_object(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<FeatureContent> {
    let mut form = UploadForm::read(multipart).await?;
    let object = form.field("object").unwrap_or_default().to_string();
    let image = form.take_file("image")?;

    let outcome = state.features.remove_object(&user, image, &object).await?;

    Ok(respond(outcome, UsageLeftField::Include))
}
