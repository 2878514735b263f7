//! Creation service - generation history and likes

use std::sync::Arc;

use tracing::info;

use crate::domain::{AuthenticatedUser, Creation, CreationId, CreationRepository, DomainError, LikeToggle};

#[derive(Debug, Clone)]
pub struct CreationService {
    repository: Arc<dyn CreationRepository>,
}

impl CreationService {
    pub fn new(repository: Arc<dyn CreationRepository>) -> Self {
        Self { repository }
    }

    /// The caller's own creations, newest first
    pub async fn list_user_creations(
        &self,
        user: &AuthenticatedUser,
    ) -> Result<Vec<Creation>, DomainError> {
        self.repository.list_by_owner(&user.user_id).await
    }

    /// Every published creation, newest first
    pub async fn list_published(&self) -> Result<Vec<Creation>, DomainError> {
        self.repository.list_published().await
    }

    pub async fn toggle_like(
        &self,
        user: &AuthenticatedUser,
        id: CreationId,
    ) -> Result<LikeToggle, DomainError> {
        let toggle = self.repository.toggle_like(id, &user.user_id).await?;
        info!(user_id = %user.user_id, creation_id = %id, liked = toggle == LikeToggle::Liked, "Like toggled");
        Ok(toggle)
    }

    pub async fn ping(&self) -> Result<(), DomainError> {
        self.repository.ping().await
    }
}
