//! Quota store trait

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use serde::Serialize;

use super::CounterKey;
use crate::domain::identity::UserId;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Current value of one durable counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageCounter {
    pub key: CounterKey,
    pub count: u32,
}

impl UsageCounter {
    pub fn new(key: CounterKey, count: u32) -> Self {
        Self { key, count }
    }

    pub fn zero(key: CounterKey) -> Self {
        Self::new(key, 0)
    }
}

/// Outcome of a conditional counter update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareAndSwap {
    /// The stored value matched and was updated; carries the new value
    Applied(UsageCounter),
    /// The stored value differed; carries the value observed instead
    Conflict(UsageCounter),
}

impl CompareAndSwap {
    pub fn counter(&self) -> UsageCounter {
        match self {
            Self::Applied(c) | Self::Conflict(c) => *c,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// All counters of one user, absent counters reported as zero
pub type UsageSnapshot = BTreeMap<CounterKey, u32>;

/// Durable per-user counters.
///
/// A counter that was never written reads as zero. Updates are conditional on the
/// caller's last observed value so concurrent writers cannot overwrite each other.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait QuotaStore: Send + Sync + Debug {
    async fn get(&self, user: &UserId, key: CounterKey) -> Result<UsageCounter, DomainError>;

    /// Set the counter to `expected + 1` if it currently equals `expected`
    async fn compare_and_increment(
        &self,
        user: &UserId,
        key: CounterKey,
        expected: u32,
    ) -> Result<CompareAndSwap, DomainError>;

    /// Set the counter to `expected - 1` if it currently equals `expected` (and is non-zero)
    async fn compare_and_decrement(
        &self,
        user: &UserId,
        key: CounterKey,
        expected: u32,
    ) -> Result<CompareAndSwap, DomainError>;

    async fn snapshot(&self, user: &UserId) -> Result<UsageSnapshot, DomainError>;
}

/// Fill in zeroes for counters a backend has never stored
pub fn complete_snapshot(mut snapshot: UsageSnapshot) -> UsageSnapshot {
    for key in CounterKey::ALL {
        snapshot.entry(key).or_insert(0);
    }
    snapshot
}
