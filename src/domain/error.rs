use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a failed call to a third-party provider.
///
/// Provider clients map transport-level signals (status codes, structured error
/// bodies) onto this enumeration; callers never inspect error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// HTTP 429 without a quota signal
    RateLimited,
    /// HTTP 503
    Overloaded,
    /// Provider-side quota or credits exhausted
    QuotaExhausted,
    /// Credentials rejected by the provider
    Unauthorized,
    /// Response could not be understood
    InvalidResponse,
    /// Anything else, including transport failures
    Other,
}

impl ProviderErrorKind {
    /// Whether another attempt can succeed without waiting for a quota window
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Overloaded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Overloaded => "overloaded",
            Self::QuotaExhausted => "quota_exhausted",
            Self::Unauthorized => "unauthorized",
            Self::InvalidResponse => "invalid_response",
            Self::Other => "other",
        }
    }

    /// Map an HTTP status code to a kind
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            503 => Self::Overloaded,
            401 | 403 => Self::Unauthorized,
            402 => Self::QuotaExhausted,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by a provider client
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{provider} {kind}: {message}")]
pub struct ProviderError {
    pub provider: String,
    pub kind: ProviderErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderError {
    pub fn new(
        provider: impl Into<String>,
        kind: ProviderErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            kind,
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn rate_limited(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::RateLimited, message)
    }

    pub fn overloaded(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Overloaded, message)
    }

    pub fn quota_exhausted(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::QuotaExhausted, message)
    }

    pub fn invalid_response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::InvalidResponse, message)
    }

    pub fn other(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Other, message)
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Provider error kind, if this error came from a provider
    pub fn provider_kind(&self) -> Option<ProviderErrorKind> {
        match self {
            Self::Provider(e) => Some(e.kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("creation 42 not found");
        assert_eq!(error.to_string(), "Not found: creation 42 not found");
    }

    #[test]
    fn test_validation_error() {
        let error = DomainError::validation("Prompt is required");
        assert_eq!(error.to_string(), "Validation error: Prompt is required");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ProviderErrorKind::from_status(429), ProviderErrorKind::RateLimited);
        assert_eq!(ProviderErrorKind::from_status(503), ProviderErrorKind::Overloaded);
        assert_eq!(ProviderErrorKind::from_status(402), ProviderErrorKind::QuotaExhausted);
        assert_eq!(ProviderErrorKind::from_status(401), ProviderErrorKind::Unauthorized);
        assert_eq!(ProviderErrorKind::from_status(400), ProviderErrorKind::Other);
        assert_eq!(ProviderErrorKind::from_status(500), ProviderErrorKind::Other);
    }

    #[test]
    fn test_transient_kinds() {
        assert!(ProviderErrorKind::RateLimited.is_transient());
        assert!(ProviderErrorKind::Overloaded.is_transient());
        assert!(!ProviderErrorKind::QuotaExhausted.is_transient());
        assert!(!ProviderErrorKind::Other.is_transient());
    }

    #[test]
    fn test_provider_error_conversion() {
        let err: DomainError = ProviderError::rate_limited("gemini", "slow down").into();
        assert_eq!(err.provider_kind(), Some(ProviderErrorKind::RateLimited));
        assert_eq!(
            err.to_string(),
            "Provider error: gemini rate_limited: slow down"
        );
    }
}
