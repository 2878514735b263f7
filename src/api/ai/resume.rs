//! Resume review endpoint

use axum::extract::{multipart::MultipartRejection, Multipart, State};

use super::{respond, FeatureContent, UploadForm, UsageLeftField};
use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::ApiResult;

/// multipart: `resume` (PDF)
pub async fn resume_review(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<FeatureContent> {
    let mut form = UploadForm::read(multipart).await?;
    let resume = form.take_file("resume")?;

    let outcome = state.features.review_resume(&user, resume).await?;

    Ok(respond(outcome, UsageLeftField::Include))
}
