//! Document text extraction

use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Extracts plain text from an uploaded document
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DocumentExtractor: Send + Sync + Debug {
    async fn extract_text(&self, data: Bytes) -> Result<String, DomainError>;
}
