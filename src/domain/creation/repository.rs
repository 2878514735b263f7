//! History store trait

use std::fmt::Debug;

use async_trait::async_trait;

use super::{Creation, CreationId, LikeToggle, NewCreation};
use crate::domain::identity::UserId;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Append-only log of generations; likes are the only mutable field
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CreationRepository: Send + Sync + Debug {
    async fn insert(&self, creation: NewCreation) -> Result<Creation, DomainError>;

    async fn get(&self, id: CreationId) -> Result<Option<Creation>, DomainError>;

    /// Creations owned by `user`, newest first
    async fn list_by_owner(&self, user: &UserId) -> Result<Vec<Creation>, DomainError>;

    /// Published creations of every user, newest first
    async fn list_published(&self) -> Result<Vec<Creation>, DomainError>;

    /// Add or remove `user` from the likes of `id`; `NotFound` if `id` does not exist
    async fn toggle_like(&self, id: CreationId, user: &UserId) -> Result<LikeToggle, DomainError>;

    /// Storage liveness probe
    async fn ping(&self) -> Result<(), DomainError>;
}
