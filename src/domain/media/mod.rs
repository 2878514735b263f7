//! Image generation and image-effects domain

use std::fmt::{self, Debug};

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::ProviderError;

#[cfg(test)]
use mockall::automock;

/// A file received from the client
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    pub fn is_pdf(&self) -> bool {
        self.content_type == "application/pdf"
    }
}

/// Media persisted on the image CDN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub public_id: String,
    pub secure_url: String,
}

/// Transformation applied by the CDN when the derived URL is fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageEffect {
    BackgroundRemoval,
    ObjectRemoval { object: String },
}

impl fmt::Display for ImageEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BackgroundRemoval => write!(f, "background_removal"),
            Self::ObjectRemoval { object } => write!(f, "object_removal({})", object),
        }
    }
}

/// Text-to-image provider
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ImageGenerator: Send + Sync + Debug {
    /// Render a prompt, returning encoded PNG bytes
    async fn generate(&self, prompt: &str) -> Result<Bytes, ProviderError>;

    fn provider_name(&self) -> &'static str;
}

/// Image CDN with on-the-fly effects
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MediaStore: Send + Sync + Debug {
    async fn upload(&self, file: UploadedFile) -> Result<StoredMedia, ProviderError>;

    /// Delivery URL of `public_id` with `effect` applied
    fn transformed_url(&self, public_id: &str, effect: &ImageEffect) -> String;

    fn provider_name(&self) -> &'static str;
}
