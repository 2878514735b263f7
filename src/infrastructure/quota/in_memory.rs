//! In-memory quota store

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::quota::complete_snapshot;
use crate::domain::{CompareAndSwap, CounterKey, DomainError, QuotaStore, UsageCounter, UsageSnapshot, UserId};

/// Counters held in process memory; every CAS runs under the write lock
#[derive(Debug, Default)]
pub struct InMemoryQuotaStore {
    counters: RwLock<HashMap<(UserId, CounterKey), u32>>,
}

impl InMemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a counter, e.g. for tests or data imports
    pub fn with_count(self, user: &UserId, key: CounterKey, count: u32) -> Self {
        if let Ok(mut counters) = self.counters.write() {
            counters.insert((user.clone(), key), count);
        }
        self
    }

    fn compare_and_set(
        &self,
        user: &UserId,
        key: CounterKey,
        expected: u32,
        next: Option<u32>,
    ) -> Result<CompareAndSwap, DomainError> {
        let mut counters = self.counters.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        let current = counters.get(&(user.clone(), key)).copied().unwrap_or(0);

        match next {
            Some(next) if current == expected => {
                counters.insert((user.clone(), key), next);
                Ok(CompareAndSwap::Applied(UsageCounter::new(key, next)))
            }
            _ => Ok(CompareAndSwap::Conflict(UsageCounter::new(key, current))),
        }
    }
}

#[async_trait]
impl QuotaStore for InMemoryQuotaStore {
    async fn get(&self, user: &UserId, key: CounterKey) -> Result<UsageCounter, DomainError> {
        let counters = self.counters.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        let count = counters.get(&(user.clone(), key)).copied().unwrap_or(0);
        Ok(UsageCounter::new(key, count))
    }

    async fn compare_and_increment(
        &self,
        user: &UserId,
        key: CounterKey,
        expected: u32,
    ) -> Result<CompareAndSwap, DomainError> {
        self.compare_and_set(user, key, expected, expected.checked_add(1))
    }

    async fn compare_and_decrement(
        &self,
        user: &UserId,
        key: CounterKey,
        expected: u32,
    ) -> Result<CompareAndSwap, DomainError> {
        self.compare_and_set(user, key, expected, expected.checked_sub(1))
    }

    async fn snapshot(&self, user: &UserId) -> Result<UsageSnapshot, DomainError> {
        let counters = self.counters.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        let snapshot = counters
            .iter()
            .filter(|((owner, _), _)| owner == user)
            .map(|((_, key), count)| (*key, *count))
            .collect();

        Ok(complete_snapshot(snapshot))
    }
}
