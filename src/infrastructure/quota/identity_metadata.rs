//! Quota counters kept in the identity provider's private user metadata

use async_trait::async_trait;
use tracing::debug;

use crate::domain::quota::complete_snapshot;
use crate::domain::{CompareAndSwap, CounterKey, DomainError, QuotaStore, UsageCounter, UsageSnapshot, UserId};
use crate::infrastructure::http::HttpClientTrait;
use crate::infrastructure::identity::{ClerkBackendClient, ClerkUser};

/// Counters stored as integer fields of Clerk `private_metadata`.
///
/// The backend API has no conditional write, so compare-and-swap is a read followed by
/// a write; two writers racing between those steps can both apply. Configuration
/// therefore only accepts this store with best-effort enforcement.
#[derive(Debug)]
pub struct IdentityMetadataQuotaStore<C: HttpClientTrait> {
    backend: ClerkBackendClient<C>,
}

impl<C: HttpClientTrait> IdentityMetadataQuotaStore<C> {
    pub fn new(backend: ClerkBackendClient<C>) -> Self {
        Self { backend }
    }

    fn read(user: &ClerkUser, key: CounterKey) -> u32 {
        user.private_metadata
            .get(key.as_str())
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0)
    }

    async fn fetch(&self, user: &UserId, key: CounterKey) -> Result<u32, DomainError> {
        let record = self.backend.get_user(user).await?;
        Ok(Self::read(&record, key))
    }

    async fn compare_and_set(
        &self,
        user: &UserId,
        key: CounterKey,
        expected: u32,
        next: Option<u32>,
    ) -> Result<CompareAndSwap, DomainError> {
        let current = self.fetch(user, key).await?;

        let next = match next {
            Some(next) if current == expected => next,
            _ => return Ok(CompareAndSwap::Conflict(UsageCounter::new(key, current))),
        };

        let mut patch = serde_json::Map::new();
        patch.insert(key.as_str().to_string(), next.into());

        let updated = self
            .backend
            .update_private_metadata(user, serde_json::Value::Object(patch))
            .await?;

        debug!(user_id = %user, counter = %key, count = next, "Updated metadata counter");
        Ok(CompareAndSwap::Applied(UsageCounter::new(
            key,
            Self::read(&updated, key),
        )))
    }
}

#[async_trait]
impl<C: HttpClientTrait> QuotaStore for IdentityMetadataQuotaStore<C> {
    async fn get(&self, user: &UserId, key: CounterKey) -> Result<UsageCounter, DomainError> {
        Ok(UsageCounter::new(key, self.fetch(user, key).await?))
    }

    async fn compare_and_increment(
        &self,
        user: &UserId,
        key: CounterKey,
        expected: u32,
    ) -> Result<CompareAndSwap, DomainError> {
        self.compare_and_set(user, key, expected, expected.checked_add(1))
            .await
    }

    async fn compare_and_decrement(
        &self,
        user: &UserId,
        key: CounterKey,
        expected: u32,
    ) -> Result<CompareAndSwap, DomainError> {
        self.compare_and_set(user, key, expected, expected.checked_sub(1))
            .await
    }

    async fn snapshot(&self, user: &UserId) -> Result<UsageSnapshot, DomainError> {
        let record = self.backend.get_user(user).await?;

        let snapshot = CounterKey::ALL
            .into_iter()
            .map(|key| (key, Self::read(&record, key)))
            .collect();

        Ok(complete_snapshot(snapshot))
    }
}
