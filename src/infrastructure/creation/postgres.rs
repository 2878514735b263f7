//! PostgreSQL history store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::domain::{
    Creation, CreationId, CreationRepository, CreationType, DomainError, LikeToggle, NewCreation,
    UserId,
};

const COLUMNS: &str = "id, user_id, prompt, content, type, publish, likes, created_at, updated_at";

/// PostgreSQL implementation of CreationRepository
#[derive(Debug, Clone)]
pub struct PostgresCreationRepository {
    pool: PgPool,
}

impl PostgresCreationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CreationRepository for PostgresCreationRepository {
    async fn insert(&self, creation: NewCreation) -> Result<Creation, DomainError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO creations (user_id, prompt, content, type, publish)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(creation.user_id.as_str())
        .bind(&creation.prompt)
        .bind(&creation.content)
        .bind(creation.kind.as_str())
        .bind(creation.publish)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to insert creation: {}", e)))?;

        row_to_creation(&row)
    }

    async fn get(&self, id: CreationId) -> Result<Option<Creation>, DomainError> {
        let row = sqlx::query(&format!("SELECT {} FROM creations WHERE id = $1", COLUMNS))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get creation: {}", e)))?;

        row.as_ref().map(row_to_creation).transpose()
    }

    async fn list_by_owner(&self, user: &UserId) -> Result<Vec<Creation>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM creations WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
            COLUMNS
        ))
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list creations: {}", e)))?;

        rows.iter().map(row_to_creation).collect()
    }

    async fn list_published(&self) -> Result<Vec<Creation>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM creations WHERE publish = TRUE ORDER BY created_at DESC, id DESC",
            COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list published creations: {}", e)))?;

        rows.iter().map(row_to_creation).collect()
    }

    async fn toggle_like(&self, id: CreationId, user: &UserId) -> Result<LikeToggle, DomainError> {
        // Membership is decided and flipped inside one row-locked statement
        let liked: Option<bool> = sqlx::query_scalar(
            r#"
            UPDATE creations
            SET likes = CASE
                    WHEN $2 = ANY(likes) THEN array_remove(likes, $2)
                    ELSE array_append(likes, $2)
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING ($2 = ANY(likes))
            "#,
        )
        .bind(id.value())
        .bind(user.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to toggle like: {}", e)))?;

        match liked {
            Some(true) => Ok(LikeToggle::Liked),
            Some(false) => Ok(LikeToggle::Unliked),
            None => Err(DomainError::not_found("Creation not found")),
        }
    }

    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Database unreachable: {}", e)))?;
        Ok(())
    }
}

fn row_to_creation(row: &PgRow) -> Result<Creation, DomainError> {
    let id: i64 = row.get("id");
    let user_id: String = row.get("user_id");
    let kind: String = row.get("type");
    let likes: Vec<String> = row.get("likes");
    let created_at: DateTime<Utc> = row.get("created_at");
    let updated_at: DateTime<Utc> = row.get("updated_at");

    Ok(Creation {
        id: CreationId::new(id)?,
        user_id: UserId::new(user_id)?,
        prompt: row.get("prompt"),
        content: row.get("content"),
        kind: CreationType::parse(&kind)
            .ok_or_else(|| DomainError::storage(format!("Unknown creation type: {}", kind)))?,
        publish: row.get("publish"),
        likes,
        created_at,
        updated_at,
    })
}
