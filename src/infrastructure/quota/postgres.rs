//! PostgreSQL quota store

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::quota::complete_snapshot;
use crate::domain::{CompareAndSwap, CounterKey, DomainError, QuotaStore, UsageCounter, UsageSnapshot, UserId};

/// Counters in `usage_counters`; each CAS is a single conditional statement
#[derive(Debug, Clone)]
pub struct PostgresQuotaStore {
    pool: PgPool,
}

impl PostgresQuotaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn current(&self, user: &UserId, key: CounterKey) -> Result<u32, DomainError> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT count FROM usage_counters WHERE user_id = $1 AND counter = $2",
        )
        .bind(user.as_str())
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to read usage counter: {}", e)))?;

        to_count(count.unwrap_or(0))
    }
}

fn to_count(value: i64) -> Result<u32, DomainError> {
    u32::try_from(value)
        .map_err(|_| DomainError::storage(format!("Usage counter out of range: {}", value)))
}

#[async_trait]
impl QuotaStore for PostgresQuotaStore {
    async fn get(&self, user: &UserId, key: CounterKey) -> Result<UsageCounter, DomainError> {
        Ok(UsageCounter::new(key, self.current(user, key).await?))
    }

    async fn compare_and_increment(
        &self,
        user: &UserId,
        key: CounterKey,
        expected: u32,
    ) -> Result<CompareAndSwap, DomainError> {
        // Inserts the first row only when the caller expected zero; otherwise the
        // update fires only if the stored value still equals `expected`.
        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO usage_counters (user_id, counter, count, updated_at)
            SELECT $1, $2, $3 + 1, NOW()
            WHERE $3 = 0 OR EXISTS (
                SELECT 1 FROM usage_counters WHERE user_id = $1 AND counter = $2
            )
            ON CONFLICT (user_id, counter) DO UPDATE
            SET count = usage_counters.count + 1, updated_at = NOW()
            WHERE usage_counters.count = $3
            RETURNING count
            "#,
        )
        .bind(user.as_str())
        .bind(key.as_str())
        .bind(i64::from(expected))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to increment usage counter: {}", e)))?;

        match updated {
            Some(count) => Ok(CompareAndSwap::Applied(UsageCounter::new(key, to_count(count)?))),
            None => Ok(CompareAndSwap::Conflict(UsageCounter::new(
                key,
                self.current(user, key).await?,
            ))),
        }
    }

    async fn compare_and_decrement(
        &self,
        user: &UserId,
        key: CounterKey,
        expected: u32,
    ) -> Result<CompareAndSwap, DomainError> {
        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE usage_counters
            SET count = count - 1, updated_at = NOW()
            WHERE user_id = $1 AND counter = $2 AND count = $3 AND count > 0
            RETURNING count
            "#,
        )
        .bind(user.as_str())
        .bind(key.as_str())
        .bind(i64::from(expected))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to decrement usage counter: {}", e)))?;

        match updated {
            Some(count) => Ok(CompareAndSwap::Applied(UsageCounter::new(key, to_count(count)?))),
            None => Ok(CompareAndSwap::Conflict(UsageCounter::new(
                key,
                self.current(user, key).await?,
            ))),
        }
    }

    async fn snapshot(&self, user: &UserId) -> Result<UsageSnapshot, DomainError> {
        let rows = sqlx::query("SELECT counter, count FROM usage_counters WHERE user_id = $1")
            .bind(user.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to read usage counters: {}", e)))?;

        let mut snapshot = UsageSnapshot::new();
        for row in rows {
            let name: String = row.get("counter");
            let count: i64 = row.get("count");

            // Rows for counters this build doesn't know are ignored
            if let Some(key) = CounterKey::parse(&name) {
                snapshot.insert(key, to_count(count)?);
            }
        }

        Ok(complete_snapshot(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_count_bounds() {
        assert_eq!(to_count(5).unwrap(), 5);
        assert!(to_count(-1).is_err());
        assert!(to_count(i64::from(u32::MAX) + 1).is_err());
    }
}
