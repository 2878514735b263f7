//! Metered AI feature endpoints under `/api/ai`

mod image;
mod resume;
mod text;
mod upload;

use axum::{routing::post, Router};
use serde::Serialize;

use super::state::AppState;
use super::types::ApiOutcome;
use crate::domain::UsageLeft;
use crate::infrastructure::services::FeatureOutcome;

pub use upload::UploadForm;

pub fn create_ai_router() -> Router<AppState> {
    Router::new()
        .route("/generate-article", post(text::generate_article))
        .route("/generate-blog-title", post(text::generate_blog_title))
        .route("/generate-image", post(image::generate_image))
        .route("/remove-image-background", post(image::remove_image_background))
        .route("/remove-image-object", post(image::remove_image_object))
        .route("/resume-review", post(resume::resume_review))
}

/// Payload of a completed feature
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureContent {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_left: Option<UsageLeft>,
}

/// Whether the endpoint reports the remaining free invocations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UsageLeftField {
    Include,
    Omit,
}

fn respond(outcome: FeatureOutcome, usage_left: UsageLeftField) -> ApiOutcome<FeatureContent> {
    match outcome {
        FeatureOutcome::Completed(result) => ApiOutcome::Ok(FeatureContent {
            content: result.content,
            usage_left: (usage_left == UsageLeftField::Include).then_some(result.usage_left),
        }),
        FeatureOutcome::Denied(denial) => denial.into(),
    }
}
