//! Clerk session verification and backend API access

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use moka::future::Cache;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::{AuthenticatedUser, DomainError, IdentityProvider, Plan, ProviderError, UserId};
use crate::infrastructure::http::HttpClientTrait;

pub const DEFAULT_CLERK_API_URL: &str = "https://api.clerk.com/v1";

const PROVIDER: &str = "clerk";

const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Session token claims issued by Clerk
#[derive(Debug, Clone, Deserialize)]
pub struct ClerkClaims {
    pub sub: String,
    pub exp: i64,
    /// Active plan, e.g. `u:premium`
    #[serde(default)]
    pub pla: Option<String>,
    /// Custom session claim mirroring the user's public metadata
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl ClerkClaims {
    /// `pla` wins over `metadata.plan`; anything unrecognised is free
    pub fn plan(&self) -> Plan {
        self.pla
            .as_deref()
            .and_then(|p| p.parse().ok())
            .or_else(|| {
                self.metadata
                    .as_ref()
                    .and_then(|m| m.get("plan"))
                    .and_then(|p| p.as_str())
                    .and_then(|p| p.parse().ok())
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kty: String,
    kid: Option<String>,
    n: Option<String>,
    e: Option<String>,
}

/// Verifies RS256 session tokens against the instance JWKS
pub struct ClerkIdentityProvider<C: HttpClientTrait> {
    client: C,
    jwks_url: String,
    keys: Cache<String, Arc<DecodingKey>>,
    leeway_secs: u64,
    /// Unknown key ids refetch the JWKS at most once per interval
    min_refresh_interval: Duration,
    last_refresh: Mutex<Option<Instant>>,
}

impl<C: HttpClientTrait> std::fmt::Debug for ClerkIdentityProvider<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClerkIdentityProvider")
            .field("jwks_url", &self.jwks_url)
            .field("cached_keys", &self.keys.entry_count())
            .finish()
    }
}

impl<C: HttpClientTrait> ClerkIdentityProvider<C> {
    pub fn new(client: C, jwks_url: impl Into<String>, key_ttl: Duration) -> Self {
        let keys = Cache::builder()
            .time_to_live(key_ttl)
            .max_capacity(32)
            .build();

        Self {
            client,
            jwks_url: jwks_url.into(),
            keys,
            leeway_secs: 5,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            last_refresh: Mutex::new(None),
        }
    }

    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    async fn refresh_keys(&self) -> Result<(), DomainError> {
        let json = self.client.get_json(PROVIDER, &self.jwks_url, vec![]).await?;
        let jwks: Jwks = serde_json::from_value(json).map_err(|e| {
            DomainError::from(ProviderError::invalid_response(
                PROVIDER,
                format!("Failed to parse JWKS: {}", e),
            ))
        })?;

        for key in jwks.keys.into_iter().filter(|k| k.kty == "RSA") {
            let (Some(kid), Some(n), Some(e)) = (key.kid, key.n, key.e) else {
                continue;
            };

            match DecodingKey::from_rsa_components(&n, &e) {
                Ok(decoding_key) => self.keys.insert(kid, Arc::new(decoding_key)).await,
                Err(err) => warn!(kid = %kid, error = %err, "Skipping malformed JWK"),
            }
        }

        debug!(keys = self.keys.entry_count(), "Refreshed JWKS");
        Ok(())
    }

    async fn key_for(&self, kid: &str) -> Result<Arc<DecodingKey>, DomainError> {
        if let Some(key) = self.keys.get(kid).await {
            return Ok(key);
        }

        let mut last_refresh = self.last_refresh.lock().await;

        // Refreshed by another request while this one waited
        if let Some(key) = self.keys.get(kid).await {
            return Ok(key);
        }

        if last_refresh.is_some_and(|at| at.elapsed() < self.min_refresh_interval) {
            debug!(kid, "Unknown signing key, JWKS refreshed recently");
            return Err(DomainError::unauthorized("Unknown signing key"));
        }

        *last_refresh = Some(Instant::now());
        self.refresh_keys().await?;
        drop(last_refresh);

        self.keys
            .get(kid)
            .await
            .ok_or_else(|| DomainError::unauthorized("Unknown signing key"))
    }
}

#[async_trait]
impl<C: HttpClientTrait> IdentityProvider for ClerkIdentityProvider<C> {
    async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, DomainError> {
        let header = decode_header(token)
            .map_err(|e| DomainError::unauthorized(format!("Malformed token: {}", e)))?;

        if header.alg != Algorithm::RS256 {
            return Err(DomainError::unauthorized("Unsupported token algorithm"));
        }

        let kid = header
            .kid
            .ok_or_else(|| DomainError::unauthorized("Token has no key id"))?;
        let key = self.key_for(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_aud = false;
        validation.leeway = self.leeway_secs;

        let data = decode::<ClerkClaims>(token, &key, &validation)
            .map_err(|e| DomainError::unauthorized(format!("Invalid token: {}", e)))?;

        let plan = data.claims.plan();
        let user_id = UserId::new(data.claims.sub)?;

        Ok(AuthenticatedUser::new(user_id, plan))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Subset of a Clerk user record
#[derive(Debug, Clone, Deserialize)]
pub struct ClerkUser {
    pub id: String,
    #[serde(default)]
    pub public_metadata: serde_json::Value,
    #[serde(default)]
    pub private_metadata: serde_json::Value,
}

/// Clerk backend API client
#[derive(Debug)]
pub struct ClerkBackendClient<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
}

impl<C: HttpClientTrait> ClerkBackendClient<C> {
    pub fn new(client: C, secret_key: impl Into<String>) -> Self {
        Self::with_base_url(client, secret_key, DEFAULT_CLERK_API_URL)
    }

    pub fn with_base_url(
        client: C,
        secret_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            auth_header: format!("Bearer {}", secret_key.into()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn parse_user(json: serde_json::Value) -> Result<ClerkUser, ProviderError> {
        serde_json::from_value(json).map_err(|e| {
            ProviderError::invalid_response(PROVIDER, format!("Failed to parse user: {}", e))
        })
    }

    pub async fn get_user(&self, user: &UserId) -> Result<ClerkUser, ProviderError> {
        let url = format!("{}/users/{}", self.base_url, user);
        let json = self.client.get_json(PROVIDER, &url, self.headers()).await?;
        Self::parse_user(json)
    }

    /// Deep-merges `private_metadata` into the user's existing private metadata
    pub async fn update_private_metadata(
        &self,
        user: &UserId,
        private_metadata: serde_json::Value,
    ) -> Result<ClerkUser, ProviderError> {
        let url = format!("{}/users/{}/metadata", self.base_url, user);
        let body = serde_json::json!({ "private_metadata": private_metadata });
        let json = self
            .client
            .patch_json(PROVIDER, &url, self.headers(), &body)
            .await?;
        Self::parse_user(json)
    }
}
