//! Generation history domain

mod entity;
mod repository;

pub use entity::{Creation, CreationId, CreationType, LikeToggle, NewCreation};
pub use repository::CreationRepository;

#[cfg(test)]
pub use repository::MockCreationRepository;
