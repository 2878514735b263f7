use axum::extract::State;

use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiOutcome, ApiResult};
use crate::infrastructure::services::UsageReport;

pub async fn get_usage_data(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> ApiResult<UsageReport> {
    let report = state.usage.usage_report(&user).await?;

    Ok(ApiOutcome::Ok(report))
}
