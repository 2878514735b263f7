//! Domain layer - Core business logic and entities

pub mod creation;
pub mod document;
pub mod error;
pub mod identity;
pub mod llm;
pub mod media;
pub mod quota;
pub mod retry;

pub use creation::{Creation, CreationId, CreationRepository, CreationType, LikeToggle, NewCreation};
pub use document::DocumentExtractor;
pub use error::{DomainError, ProviderError, ProviderErrorKind};
pub use identity::{AuthenticatedUser, IdentityProvider, UserId};
pub use llm::{LlmProvider, LlmRequest, LlmRequestBuilder, LlmResponse, Message, MessageRole, Usage};
pub use media::{ImageEffect, ImageGenerator, MediaStore, StoredMedia, UploadedFile};
pub use quota::{
    CompareAndSwap, CounterKey, Feature, Plan, QuotaDecision, QuotaDenial, QuotaGate, QuotaLimits,
    QuotaStore, UsageCounter, UsageLeft, UsageSnapshot,
};
pub use retry::{with_retry, RetryPolicy};
