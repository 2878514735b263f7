//! HS256 session tokens signed with a shared secret

use async_trait::async_trait;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::{AuthenticatedUser, DomainError, IdentityProvider, Plan, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub plan: Option<String>,
}

/// Identity provider for local development and integration tests
#[derive(Clone)]
pub struct SharedSecretIdentityProvider {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for SharedSecretIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecretIdentityProvider")
            .field("secret", &"[hidden]")
            .finish()
    }
}

impl SharedSecretIdentityProvider {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a token for `user`, valid for `ttl_secs`
    pub fn issue(&self, user: &UserId, plan: Plan, ttl_secs: i64) -> Result<String, DomainError> {
        let plan = match plan {
            Plan::Free => "free",
            Plan::Premium => "premium",
        };
        let claims = SessionClaims {
            sub: user.as_str().to_string(),
            exp: chrono::Utc::now().timestamp() + ttl_secs,
            plan: Some(plan.to_string()),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| DomainError::internal(format!("Failed to sign token: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for SharedSecretIdentityProvider {
    async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, DomainError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;

        let data = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| DomainError::unauthorized(format!("Invalid token: {}", e)))?;

        let plan = data
            .claims
            .plan
            .as_deref()
            .and_then(|p| p.parse().ok())
            .unwrap_or_default();

        Ok(AuthenticatedUser::new(UserId::new(data.claims.sub)?, plan))
    }

    fn provider_name(&self) -> &'static str {
        "shared_secret"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_issue_and_authenticate() {
        let provider = SharedSecretIdentityProvider::new("dev-secret");
        let user = UserId::new("user_42").unwrap();

        let token = provider.issue(&user, Plan::Premium, 3600).unwrap();
        let authenticated = provider.authenticate(&token).await.unwrap();

        assert_eq!(authenticated.user_id, user);
        assert!(authenticated.is_premium());
    }

    #[tokio::test]
    async fn test_wrong_secret_rejected() {
        let issuer = SharedSecretIdentityProvider::new("a");
        let verifier = SharedSecretIdentityProvider::new("b");
        let token = issuer
            .issue(&UserId::new("u").unwrap(), Plan::Free, 3600)
            .unwrap();

        let err = verifier.authenticate(&token).await.unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let provider = SharedSecretIdentityProvider::new("s");
        let token = provider
            .issue(&UserId::new("u").unwrap(), Plan::Free, -3600)
            .unwrap();

        assert!(provider.authenticate(&token).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_plan_is_free() {
        let provider = SharedSecretIdentityProvider::new("s");
        let claims = serde_json::json!({"sub": "u", "exp": chrono::Utc::now().timestamp() + 60});
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"s")).unwrap();

        let user = provider.authenticate(&token).await.unwrap();
        assert_eq!(user.plan, Plan::Free);
    }
}
