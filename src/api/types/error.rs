//! Failure half of the response envelope

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::domain::{DomainError, ProviderErrorKind};

pub const RATE_LIMIT_MESSAGE: &str = "API rate limit exceeded. Please wait a moment and try again.";
pub const PROVIDER_QUOTA_MESSAGE: &str =
    "API quota exceeded. Please try again later or check your API key.";
const PROVIDER_MESSAGE: &str = "The AI service could not complete the request. Please try again.";
const PERSISTENCE_MESSAGE: &str = "Failed to save the result. Please try again.";
const CONFLICT_MESSAGE: &str = "Too many concurrent requests. Please try again.";
const INTERNAL_MESSAGE: &str = "Something went wrong. Please try again later.";

/// Failure category, kept for logs and tests; clients only see the message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Validation,
    Unauthorized,
    NotFound,
    ProviderRateLimited,
    ProviderQuota,
    Provider,
    Persistence,
    Conflict,
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::ProviderRateLimited => "provider_rate_limited",
            Self::ProviderQuota => "provider_quota",
            Self::Provider => "provider",
            Self::Persistence => "persistence",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
        }
    }
}

#[derive(Debug, Serialize)]
struct FailureBody<'a> {
    success: bool,
    message: &'a str,
}

/// `{"success": false, "message": ...}` with a client-safe message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    pub status: StatusCode,
    pub kind: FailureKind,
    pub message: String,
}

impl ApiFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Validation, message)
    }

    /// The only failure answered with a non-200 status
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            ..Self::new(FailureKind::Unauthorized, message)
        }
    }

    pub fn internal() -> Self {
        Self::new(FailureKind::Internal, INTERNAL_MESSAGE)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = FailureBody {
            success: false,
            message: &self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<DomainError> for ApiFailure {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation { message } => Self::validation(message),
            DomainError::NotFound { message } => Self::new(FailureKind::NotFound, message),
            DomainError::Unauthorized { message } => Self::unauthorized(message),
            DomainError::Provider(e) => {
                warn!(provider = %e.provider, kind = %e.kind, status = ?e.status, message = %e.message, "Provider failure");
                match e.kind {
                    ProviderErrorKind::RateLimited | ProviderErrorKind::Overloaded => {
                        Self::new(FailureKind::ProviderRateLimited, RATE_LIMIT_MESSAGE)
                    }
                    ProviderErrorKind::QuotaExhausted => {
                        Self::new(FailureKind::ProviderQuota, PROVIDER_QUOTA_MESSAGE)
                    }
                    _ => Self::new(FailureKind::Provider, PROVIDER_MESSAGE),
                }
            }
            DomainError::Storage { message } => {
                error!(error = %message, "Storage failure");
                Self::new(FailureKind::Persistence, PERSISTENCE_MESSAGE)
            }
            DomainError::Conflict { message } => {
                warn!(error = %message, "Conflict");
                Self::new(FailureKind::Conflict, CONFLICT_MESSAGE)
            }
            DomainError::Configuration { message } | DomainError::Internal { message } => {
                error!(error = %message, "Internal failure");
                Self::internal()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProviderError;

    #[test]
    fn test_validation_message_passes_through() {
        let failure = ApiFailure::from(DomainError::validation("Prompt is required"));

        assert_eq!(failure.status, StatusCode::OK);
        assert_eq!(failure.kind, FailureKind::Validation);
        assert_eq!(failure.message, "Prompt is required");
    }

    #[test]
    fn test_transient_provider_errors_share_rate_limit_message() {
        for err in [
            ProviderError::rate_limited("gemini", "429"),
            ProviderError::overloaded("gemini", "503"),
        ] {
            let failure = ApiFailure::from(DomainError::from(err));
            assert_eq!(failure.kind, FailureKind::ProviderRateLimited);
            assert_eq!(failure.message, RATE_LIMIT_MESSAGE);
        }
    }

    #[test]
    fn test_provider_quota_message() {
        let failure = ApiFailure::from(DomainError::from(ProviderError::quota_exhausted(
            "gemini",
            "RESOURCE_EXHAUSTED",
        )));

        assert_eq!(failure.kind, FailureKind::ProviderQuota);
        assert_eq!(failure.message, PROVIDER_QUOTA_MESSAGE);
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let failure = ApiFailure::from(DomainError::storage("connection refused at 10.0.0.3"));
        assert_eq!(failure.kind, FailureKind::Persistence);
        assert!(!failure.message.contains("10.0.0.3"));

        let failure = ApiFailure::from(DomainError::from(ProviderError::other(
            "clipdrop",
            "stack trace",
        )));
        assert!(!failure.message.contains("stack trace"));
    }

    #[test]
    fn test_unauthorized_status() {
        let failure = ApiFailure::from(DomainError::unauthorized("expired"));
        assert_eq!(failure.status, StatusCode::UNAUTHORIZED);
        assert_eq!(failure.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}
