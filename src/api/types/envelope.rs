//! Success and denial halves of the response envelope

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

use super::error::ApiFailure;
use crate::domain::QuotaDenial;

/// A handled request: the payload's fields are merged next to `"success": true`
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome<T> {
    Ok(T),
    Denied { message: String },
}

pub type ApiResult<T> = Result<ApiOutcome<T>, ApiFailure>;

impl<T> From<QuotaDenial> for ApiOutcome<T> {
    fn from(denial: QuotaDenial) -> Self {
        Self::Denied {
            message: denial.message,
        }
    }
}

impl<T: Serialize> ApiOutcome<T> {
    pub fn into_body(self) -> Result<Value, ApiFailure> {
        match self {
            Self::Ok(payload) => match serde_json::to_value(payload) {
                Ok(Value::Object(mut fields)) => {
                    fields.insert("success".to_string(), Value::Bool(true));
                    Ok(Value::Object(fields))
                }
                Ok(other) => {
                    error!(payload = %other, "Response payload is not a JSON object");
                    Err(ApiFailure::internal())
                }
                Err(e) => {
                    error!(error = %e, "Failed to serialize response payload");
                    Err(ApiFailure::internal())
                }
            },
            Self::Denied { message } => Ok(json!({ "success": false, "message": message })),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiOutcome<T> {
    fn into_response(self) -> Response {
        match self.into_body() {
            Ok(body) => (StatusCode::OK, Json(body)).into_response(),
            Err(failure) => failure.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Feature;

    #[derive(Serialize)]
    struct Content {
        content: &'static str,
    }

    #[test]
    fn test_ok_merges_payload() {
        let body = ApiOutcome::Ok(Content { content: "hello" }).into_body().unwrap();
        assert_eq!(body, json!({ "success": true, "content": "hello" }));
    }

    #[test]
    fn test_denial_body() {
        let denial = QuotaDenial {
            feature: Feature::Article,
            limit: 10,
            used: 10,
            message: "Limit reached. Upgrade to continue.".to_string(),
        };

        let body = ApiOutcome::<Content>::from(denial).into_body().unwrap();
        assert_eq!(
            body,
            json!({ "success": false, "message": "Limit reached. Upgrade to continue." })
        );
    }

    #[test]
    fn test_non_object_payload_is_internal_failure() {
        let failure = ApiOutcome::Ok(42).into_body().unwrap_err();
        assert_eq!(failure.kind, crate::api::types::FailureKind::Internal);
    }

    #[test]
    fn test_always_http_200() {
        let response = ApiOutcome::<Content>::Denied {
            message: "no".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
