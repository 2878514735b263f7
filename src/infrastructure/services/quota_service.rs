//! Quota service - admission, commit and release around metered features

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::{
    AuthenticatedUser, CompareAndSwap, DomainError, Feature, QuotaDecision, QuotaDenial,
    QuotaGate, QuotaStore, UsageLeft, UserId,
};
use crate::infrastructure::observability::{record_cas_conflict, record_quota_decision};

/// When a free-plan invocation claims its slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Enforcement {
    /// Slot reserved atomically at admission and returned if the work fails.
    /// Concurrent requests can never take a free user past the limit.
    #[default]
    Strict,
    /// Checked at admission, counted after the work succeeds. Concurrent requests
    /// that pass the check together all succeed and the counter may exceed the limit.
    BestEffort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    /// Premium: nothing is counted
    Unmetered,
    /// Counter already advanced to `count` on the caller's behalf
    Reserved { count: u32 },
    /// Counter observed at `observed`; advanced on commit
    Pending { observed: u32 },
}

/// An admitted invocation that must be committed or released
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    user_id: UserId,
    feature: Feature,
    limit: u32,
    slot: Slot,
}

impl Reservation {
    pub fn feature(&self) -> Feature {
        self.feature
    }
}

/// Outcome of [`QuotaService::admit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Granted(Reservation),
    Denied(QuotaDenial),
}

/// Applies the quota gate against the quota store
#[derive(Debug)]
pub struct QuotaService {
    store: Arc<dyn QuotaStore>,
    gate: QuotaGate,
    enforcement: Enforcement,
    max_cas_attempts: u32,
}

impl QuotaService {
    pub fn new(store: Arc<dyn QuotaStore>, gate: QuotaGate) -> Self {
        Self {
            store,
            gate,
            enforcement: Enforcement::default(),
            max_cas_attempts: 16,
        }
    }

    pub fn with_enforcement(mut self, enforcement: Enforcement) -> Self {
        self.enforcement = enforcement;
        self
    }

    pub fn with_max_cas_attempts(mut self, attempts: u32) -> Self {
        self.max_cas_attempts = attempts.max(1);
        self
    }

    pub fn gate(&self) -> &QuotaGate {
        &self.gate
    }

    pub fn enforcement(&self) -> Enforcement {
        self.enforcement
    }

    fn contention_error(user: &UserId, feature: Feature) -> DomainError {
        warn!(user_id = %user, feature = %feature, "Usage counter CAS attempts exhausted");
        DomainError::conflict("Usage counter is busy, please try again")
    }

    /// Decide whether `user` may invoke `feature`
    pub async fn admit(
        &self,
        user: &AuthenticatedUser,
        feature: Feature,
    ) -> Result<Admission, DomainError> {
        let limit = self.gate.limit_for(feature);

        if user.is_premium() {
            record_quota_decision(feature, true);
            return Ok(Admission::Granted(Reservation {
                user_id: user.user_id.clone(),
                feature,
                limit,
                slot: Slot::Unmetered,
            }));
        }

        let key = feature.counter_key();
        let mut observed = self.store.get(&user.user_id, key).await?.count;

        for _ in 0..self.max_cas_attempts {
            if let QuotaDecision::Denied(denial) = self.gate.check(user.plan, feature, observed) {
                debug!(user_id = %user.user_id, feature = %feature, used = observed, "Quota denied");
                record_quota_decision(feature, false);
                return Ok(Admission::Denied(denial));
            }

            let slot = match self.enforcement {
                Enforcement::BestEffort => Slot::Pending { observed },
                Enforcement::Strict => {
                    match self
                        .store
                        .compare_and_increment(&user.user_id, key, observed)
                        .await?
                    {
                        CompareAndSwap::Applied(counter) => Slot::Reserved {
                            count: counter.count,
                        },
                        CompareAndSwap::Conflict(counter) => {
                            record_cas_conflict(feature);
                            observed = counter.count;
                            continue;
                        }
                    }
                }
            };

            record_quota_decision(feature, true);
            return Ok(Admission::Granted(Reservation {
                user_id: user.user_id.clone(),
                feature,
                limit,
                slot,
            }));
        }

        Err(Self::contention_error(&user.user_id, feature))
    }

    /// Make the invocation count and report what is left
    pub async fn commit(&self, reservation: Reservation) -> Result<UsageLeft, DomainError> {
        let mut expected = match reservation.slot {
            Slot::Unmetered => return Ok(UsageLeft::Unlimited),
            Slot::Reserved { count } => return Ok(UsageLeft::after(reservation.limit, count)),
            Slot::Pending { observed } => observed,
        };

        let key = reservation.feature.counter_key();

        for _ in 0..self.max_cas_attempts {
            match self
                .store
                .compare_and_increment(&reservation.user_id, key, expected)
                .await?
            {
                CompareAndSwap::Applied(counter) => {
                    return Ok(UsageLeft::after(reservation.limit, counter.count));
                }
                CompareAndSwap::Conflict(counter) => {
                    record_cas_conflict(reservation.feature);
                    expected = counter.count;
                }
            }
        }

        Err(Self::contention_error(&reservation.user_id, reservation.feature))
    }

    /// Give back a slot reserved for work that did not complete
    pub async fn release(&self, reservation: Reservation) -> Result<(), DomainError> {
        let Slot::Reserved { count } = reservation.slot else {
            return Ok(());
        };

        let key = reservation.feature.counter_key();
        let mut expected = count;

        for _ in 0..self.max_cas_attempts {
            if expected == 0 {
                return Ok(());
            }

            match self
                .store
                .compare_and_decrement(&reservation.user_id, key, expected)
                .await?
            {
                CompareAndSwap::Applied(_) => {
                    debug!(user_id = %reservation.user_id, feature = %reservation.feature, "Released quota slot");
                    return Ok(());
                }
                CompareAndSwap::Conflict(counter) => {
                    record_cas_conflict(reservation.feature);
                    expected = counter.count;
                }
            }
        }

        Err(Self::contention_error(&reservation.user_id, reservation.feature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use tokio_test::assert_ok;

    use crate::domain::quota::MockQuotaStore;
    use crate::domain::{CounterKey, Plan, QuotaLimits};
    use crate::infrastructure::quota::InMemoryQuotaStore;

    fn free_user() -> AuthenticatedUser {
        AuthenticatedUser::new(UserId::new("free_user").unwrap(), Plan::Free)
    }

    fn premium_user() -> AuthenticatedUser {
        AuthenticatedUser::new(UserId::new("premium_user").unwrap(), Plan::Premium)
    }

    fn service(store: Arc<dyn QuotaStore>, enforcement: Enforcement) -> QuotaService {
        QuotaService::new(store, QuotaGate::new(QuotaLimits::default())).with_enforcement(enforcement)
    }

    fn granted(admission: Admission) -> Reservation {
        match admission {
            Admission::Granted(r) => r,
            Admission::Denied(d) => panic!("unexpected denial: {}", d.message),
        }
    }

    #[tokio::test]
    async fn test_premium_touches_no_counter() {
        let mut store = MockQuotaStore::new();
        store.expect_get().times(0);
        store.expect_compare_and_increment().times(0);

        let service = service(Arc::new(store), Enforcement::Strict);
        let reservation = granted(service.admit(&premium_user(), Feature::Image).await.unwrap());

        assert_eq!(service.commit(reservation).await.unwrap(), UsageLeft::Unlimited);
    }

    #[tokio::test]
    async fn test_strict_reserves_at_admission() {
        let user = free_user();
        let store = Arc::new(
            InMemoryQuotaStore::new().with_count(&user.user_id, CounterKey::BgRemovalUsage, 4),
        );
        let service = service(store.clone(), Enforcement::Strict);

        let reservation = granted(service.admit(&user, Feature::BackgroundRemoval).await.unwrap());
        assert_eq!(store.get(&user.user_id, CounterKey::BgRemovalUsage).await.unwrap().count, 5);

        assert_eq!(service.commit(reservation).await.unwrap(), UsageLeft::Remaining(0));
        assert_eq!(store.get(&user.user_id, CounterKey::BgRemovalUsage).await.unwrap().count, 5);
    }

    #[tokio::test]
    async fn test_denied_at_limit_leaves_counter() {
        let user = free_user();
        let store = Arc::new(
            InMemoryQuotaStore::new().with_count(&user.user_id, CounterKey::BgRemovalUsage, 5),
        );
        let service = service(store.clone(), Enforcement::Strict);

        match service.admit(&user, Feature::BackgroundRemoval).await.unwrap() {
            Admission::Denied(denial) => {
                assert_eq!(denial.limit, 5);
                assert!(denial.message.contains("Upgrade"));
            }
            Admission::Granted(_) => panic!("expected denial"),
        }

        assert_eq!(store.get(&user.user_id, CounterKey::BgRemovalUsage).await.unwrap().count, 5);
    }

    #[tokio::test]
    async fn test_release_returns_slot() {
        let user = free_user();
        let store = Arc::new(InMemoryQuotaStore::new());
        let service = service(store.clone(), Enforcement::Strict);

        let reservation = granted(service.admit(&user, Feature::Article).await.unwrap());
        assert_eq!(store.get(&user.user_id, CounterKey::FreeUsage).await.unwrap().count, 1);

        service.release(reservation).await.unwrap();
        assert_eq!(store.get(&user.user_id, CounterKey::FreeUsage).await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_strict_concurrent_at_limit_minus_one_admits_one() {
        let user = free_user();
        let store = Arc::new(
            InMemoryQuotaStore::new().with_count(&user.user_id, CounterKey::ObjRemovalUsage, 4),
        );
        let service = Arc::new(service(store.clone(), Enforcement::Strict));

        let (a, b) = tokio::join!(
            service.admit(&user, Feature::ObjectRemoval),
            service.admit(&user, Feature::ObjectRemoval)
        );

        let admitted = [a.unwrap(), b.unwrap()]
            .into_iter()
            .filter(|adm| matches!(adm, Admission::Granted(_)))
            .count();

        assert_eq!(admitted, 1);
        assert_eq!(store.get(&user.user_id, CounterKey::ObjRemovalUsage).await.unwrap().count, 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_strict_never_exceeds_limit_across_threads() {
        let user = free_user();
        let store = Arc::new(
            InMemoryQuotaStore::new().with_count(&user.user_id, CounterKey::BgRemovalUsage, 2),
        );
        let service = Arc::new(service(store.clone(), Enforcement::Strict));

        let handles = (0..20).map(|_| {
            let service = service.clone();
            let user = user.clone();
            tokio::spawn(async move { service.admit(&user, Feature::BackgroundRemoval).await })
        });

        let mut admitted = 0;
        for joined in join_all(handles).await {
            let admission = assert_ok!(assert_ok!(joined));
            if matches!(admission, Admission::Granted(_)) {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 3);
        assert_eq!(store.get(&user.user_id, CounterKey::BgRemovalUsage).await.unwrap().count, 5);
    }

    #[tokio::test]
    async fn test_best_effort_interleaving_overshoots() {
        let user = free_user();
        let store = Arc::new(
            InMemoryQuotaStore::new().with_count(&user.user_id, CounterKey::ObjRemovalUsage, 4),
        );
        let service = service(store.clone(), Enforcement::BestEffort);

        // Both requests pass the check before either commits
        let first = granted(service.admit(&user, Feature::ObjectRemoval).await.unwrap());
        let second = granted(service.admit(&user, Feature::ObjectRemoval).await.unwrap());

        assert_eq!(service.commit(first).await.unwrap(), UsageLeft::Remaining(0));
        assert_eq!(service.commit(second).await.unwrap(), UsageLeft::Remaining(0));
        assert_eq!(store.get(&user.user_id, CounterKey::ObjRemovalUsage).await.unwrap().count, 6);
    }

    #[tokio::test]
    async fn test_best_effort_counts_on_commit_only() {
        let user = free_user();
        let store = Arc::new(InMemoryQuotaStore::new());
        let service = service(store.clone(), Enforcement::BestEffort);

        let reservation = granted(service.admit(&user, Feature::ResumeReview).await.unwrap());
        assert_eq!(store.get(&user.user_id, CounterKey::ResumeReviewUsage).await.unwrap().count, 0);

        service.release(reservation).await.unwrap();
        assert_eq!(store.get(&user.user_id, CounterKey::ResumeReviewUsage).await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_cas_attempts_are_bounded() {
        let mut store = MockQuotaStore::new();
        store
            .expect_get()
            .returning(|_, key| Ok(crate::domain::UsageCounter::new(key, 0)));
        store
            .expect_compare_and_increment()
            .times(3)
            .returning(|_, key, _| Ok(CompareAndSwap::Conflict(crate::domain::UsageCounter::new(key, 0))));

        let service = service(Arc::new(store), Enforcement::Strict).with_max_cas_attempts(3);

        let err = service.admit(&free_user(), Feature::Article).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_shared_counter_uses_feature_limit() {
        let user = free_user();
        let store = Arc::new(InMemoryQuotaStore::new().with_count(&user.user_id, CounterKey::FreeUsage, 5));
        let service = service(store, Enforcement::Strict);

        // Images stop at 5 while articles continue to 10 on the same counter
        assert!(matches!(
            service.admit(&user, Feature::Image).await.unwrap(),
            Admission::Denied(_)
        ));
        assert!(matches!(
            service.admit(&user, Feature::Article).await.unwrap(),
            Admission::Granted(_)
        ));
    }
}
