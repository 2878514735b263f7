//! JSON body extractor whose rejections become failure envelopes

use axum::{
    extract::{FromRequest, Request},
    Json as AxumJson,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use super::error::ApiFailure;

/// JSON body that is deserialized and then validated
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiFailure;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let AxumJson(value) = AxumJson::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiFailure::validation(format_rejection_message(&rejection)))?;

        value
            .validate()
            .map_err(|errors| ApiFailure::validation(validation_message(&errors)))?;

        Ok(Json(value))
    }
}

fn format_rejection_message(rejection: &axum::extract::rejection::JsonRejection) -> String {
    use axum::extract::rejection::JsonRejection::*;

    match rejection {
        JsonDataError(err) => format!("Invalid JSON data: {}", err.body_text()),
        JsonSyntaxError(err) => format!("Invalid JSON syntax: {}", err.body_text()),
        MissingJsonContentType(_) => {
            "Missing Content-Type header. Expected 'application/json'.".to_string()
        }
        BytesRejection(err) => format!("Failed to read request body: {}", err.body_text()),
        _ => "Invalid JSON request".to_string(),
    }
}

/// First field message, falling back to the generic rendering
fn validation_message(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::FailureKind;
    use axum::body::Body;
    use axum::http::header;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct PromptBody {
        #[validate(length(min = 1, message = "Prompt is required"))]
        prompt: String,
    }

    fn request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_body() {
        let Json(body) = Json::<PromptBody>::from_request(request(r#"{"prompt":"hi"}"#), &())
            .await
            .unwrap();
        assert_eq!(body.prompt, "hi");
    }

    #[tokio::test]
    async fn test_validation_message() {
        let failure = Json::<PromptBody>::from_request(request(r#"{"prompt":""}"#), &())
            .await
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::Validation);
        assert_eq!(failure.message, "Prompt is required");
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation_failure() {
        let failure = Json::<PromptBody>::from_request(request("{"), &())
            .await
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::Validation);
        assert!(failure.message.starts_with("Invalid JSON syntax"));
    }
}
