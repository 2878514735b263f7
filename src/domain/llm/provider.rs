use std::fmt::Debug;

use async_trait::async_trait;

use super::{LlmRequest, LlmResponse};
use crate::domain::ProviderError;

#[cfg(test)]
use mockall::automock;

/// Generative-text provider
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LlmProvider: Send + Sync + Debug {
    /// Run a single chat completion
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, ProviderError>;

    fn provider_name(&self) -> &'static str;
}
