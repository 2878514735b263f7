//! Usage service - per-user counter report

use std::sync::Arc;

use serde::Serialize;

use crate::domain::{AuthenticatedUser, CounterKey, DomainError, QuotaLimits, QuotaStore};

/// Counters and limits shown to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    /// Shared counter of the text and image generation features
    pub usage_count: u32,
    pub is_premium: bool,
    pub bg_removal_usage: u32,
    pub obj_removal_usage: u32,
    pub resume_review_usage: u32,
    pub limits: QuotaLimits,
}

#[derive(Debug, Clone)]
pub struct UsageService {
    store: Arc<dyn QuotaStore>,
    limits: QuotaLimits,
}

impl UsageService {
    pub fn new(store: Arc<dyn QuotaStore>, limits: QuotaLimits) -> Self {
        Self { store, limits }
    }

    pub async fn usage_report(&self, user: &AuthenticatedUser) -> Result<UsageReport, DomainError> {
        let snapshot = self.store.snapshot(&user.user_id).await?;
        let count = |key: CounterKey| snapshot.get(&key).copied().unwrap_or(0);

        Ok(UsageReport {
            usage_count: count(CounterKey::FreeUsage),
            is_premium: user.is_premium(),
            bg_removal_usage: count(CounterKey::BgRemovalUsage),
            obj_removal_usage: count(CounterKey::ObjRemovalUsage),
            resume_review_usage: count(CounterKey::ResumeReviewUsage),
            limits: self.limits.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quota::MockQuotaStore;
    use crate::domain::{Plan, UsageSnapshot, UserId};
    use crate::infrastructure::quota::InMemoryQuotaStore;

    #[tokio::test]
    async fn test_report_reads_every_counter() {
        let user = AuthenticatedUser::new(UserId::new("user_1").unwrap(), Plan::Free);
        let store = InMemoryQuotaStore::new()
            .with_count(&user.user_id, CounterKey::FreeUsage, 7)
            .with_count(&user.user_id, CounterKey::ObjRemovalUsage, 2);
        let service = UsageService::new(Arc::new(store), QuotaLimits::default());

        let report = service.usage_report(&user).await.unwrap();

        assert_eq!(report.usage_count, 7);
        assert_eq!(report.obj_removal_usage, 2);
        assert_eq!(report.bg_removal_usage, 0);
        assert!(!report.is_premium);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["usageCount"], 7);
        assert_eq!(json["resumeReviewUsage"], 0);
    }

    #[tokio::test]
    async fn test_premium_flag_and_missing_counters() {
        let user = AuthenticatedUser::new(UserId::new("user_2").unwrap(), Plan::Premium);
        let mut store = MockQuotaStore::new();
        store
            .expect_snapshot()
            .times(1)
            .returning(|_| Ok(UsageSnapshot::new()));
        let service = UsageService::new(Arc::new(store), QuotaLimits::default());

        let report = service.usage_report(&user).await.unwrap();

        assert!(report.is_premium);
        assert_eq!(report.usage_count, 0);
    }
}
