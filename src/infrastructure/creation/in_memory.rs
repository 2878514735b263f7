//! In-memory history store

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{Creation, CreationId, CreationRepository, DomainError, LikeToggle, NewCreation, UserId};

/// Thread-safe in-memory history store. Data is lost when the process terminates.
#[derive(Debug)]
pub struct InMemoryCreationRepository {
    creations: RwLock<BTreeMap<CreationId, Creation>>,
    next_id: AtomicI64,
}

impl Default for InMemoryCreationRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCreationRepository {
    pub fn new() -> Self {
        Self {
            creations: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn newest_first(mut creations: Vec<Creation>) -> Vec<Creation> {
        creations.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        creations
    }
}

#[async_trait]
impl CreationRepository for InMemoryCreationRepository {
    async fn insert(&self, creation: NewCreation) -> Result<Creation, DomainError> {
        let id = CreationId::new(self.next_id.fetch_add(1, Ordering::SeqCst))?;
        let creation = Creation::from_new(id, creation, Utc::now());

        let mut creations = self.creations.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;
        creations.insert(id, creation.clone());

        Ok(creation)
    }

    async fn get(&self, id: CreationId) -> Result<Option<Creation>, DomainError> {
        let creations = self.creations.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(creations.get(&id).cloned())
    }

    async fn list_by_owner(&self, user: &UserId) -> Result<Vec<Creation>, DomainError> {
        let creations = self.creations.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        let owned = creations
            .values()
            .filter(|c| &c.user_id == user)
            .cloned()
            .collect();

        Ok(Self::newest_first(owned))
    }

    async fn list_published(&self) -> Result<Vec<Creation>, DomainError> {
        let creations = self.creations.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        let published = creations.values().filter(|c| c.publish).cloned().collect();
        Ok(Self::newest_first(published))
    }

    async fn toggle_like(&self, id: CreationId, user: &UserId) -> Result<LikeToggle, DomainError> {
        let mut creations = self.creations.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        let creation = creations
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Creation not found"))?;

        Ok(creation.toggle_like(user))
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CreationType;

    fn owner() -> UserId {
        UserId::new("owner").unwrap()
    }

    fn new_creation(prompt: &str, publish: bool) -> NewCreation {
        NewCreation::new(owner(), CreationType::Article, prompt, "content").published(publish)
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let repo = InMemoryCreationRepository::new();

        let a = repo.insert(new_creation("a", false)).await.unwrap();
        let b = repo.insert(new_creation("b", false)).await.unwrap();

        assert!(b.id > a.id);
        assert!(a.likes.is_empty());
        assert_eq!(repo.get(a.id).await.unwrap().unwrap().prompt, "a");
    }

    #[tokio::test]
    async fn test_list_by_owner_newest_first() {
        let repo = InMemoryCreationRepository::new();
        repo.insert(new_creation("first", false)).await.unwrap();
        repo.insert(new_creation("second", false)).await.unwrap();
        repo.insert(NewCreation::new(
            UserId::new("other").unwrap(),
            CreationType::Image,
            "theirs",
            "url",
        ))
        .await
        .unwrap();

        let mine = repo.list_by_owner(&owner()).await.unwrap();
        let prompts: Vec<_> = mine.iter().map(|c| c.prompt.as_str()).collect();

        assert_eq!(prompts, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_list_published_filters() {
        let repo = InMemoryCreationRepository::new();
        repo.insert(new_creation("private", false)).await.unwrap();
        repo.insert(new_creation("public", true)).await.unwrap();

        let published = repo.list_published().await.unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].prompt, "public");
    }

    #[tokio::test]
    async fn test_toggle_like_round_trip() {
        let repo = InMemoryCreationRepository::new();
        let c = repo.insert(new_creation("p", true)).await.unwrap();
        let fan = UserId::new("fan").unwrap();

        assert_eq!(repo.toggle_like(c.id, &fan).await.unwrap(), LikeToggle::Liked);
        assert_eq!(repo.get(c.id).await.unwrap().unwrap().likes, vec!["fan".to_string()]);
        assert_eq!(repo.toggle_like(c.id, &fan).await.unwrap(), LikeToggle::Unliked);
        assert!(repo.get(c.id).await.unwrap().unwrap().likes.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_like_missing_creation() {
        let repo = InMemoryCreationRepository::new();
        let err = repo
            .toggle_like(CreationId::new(42).unwrap(), &owner())
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::NotFound { .. }));
    }
}
