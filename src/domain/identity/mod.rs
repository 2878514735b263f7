//! Identity domain - authenticated callers and their plan

use std::fmt::{self, Debug};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::quota::Plan;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Identifier assigned by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        let trimmed = id.trim();

        if trimmed.is_empty() {
            return Err(DomainError::validation("User ID cannot be empty"));
        }

        if trimmed.len() > 255 {
            return Err(DomainError::validation("User ID too long (max 255 chars)"));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller resolved from a verified session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub plan: Plan,
}

impl AuthenticatedUser {
    pub fn new(user_id: UserId, plan: Plan) -> Self {
        Self { user_id, plan }
    }

    pub fn is_premium(&self) -> bool {
        self.plan.is_premium()
    }
}

/// Verifies session tokens issued by the identity provider
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync + Debug {
    async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, DomainError>;

    fn provider_name(&self) -> &'static str;
}
