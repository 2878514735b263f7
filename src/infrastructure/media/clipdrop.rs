use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::{ImageGenerator, ProviderError};
use crate::infrastructure::http::HttpClientTrait;

pub const DEFAULT_CLIPDROP_BASE_URL: &str = "https://clipdrop-api.co";

const PROVIDER: &str = "clipdrop";

/// Clipdrop text-to-image client
#[derive(Debug)]
pub struct ClipdropImageGenerator<C: HttpClientTrait> {
    client: C,
    api_key: String,
    base_url: String,
}

impl<C: HttpClientTrait> ClipdropImageGenerator<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_CLIPDROP_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn text_to_image_url(&self) -> String {
        format!("{}/text-to-image/v1", self.base_url)
    }
}

#[async_trait]
impl<C: HttpClientTrait> ImageGenerator for ClipdropImageGenerator<C> {
    async fn generate(&self, prompt: &str) -> Result<Bytes, ProviderError> {
        let url = self.text_to_image_url();
        let image = self
            .client
            .post_form(
                PROVIDER,
                &url,
                vec![("x-api-key", self.api_key.as_str())],
                vec![("prompt".to_string(), prompt.to_string())],
            )
            .await?;

        if image.is_empty() {
            return Err(ProviderError::invalid_response(PROVIDER, "Empty image body"));
        }

        Ok(image)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProviderErrorKind;
    use crate::infrastructure::http::mock::MockHttpClient;

    const TEST_URL: &str = "https://clipdrop-api.co/text-to-image/v1";

    #[tokio::test]
    async fn test_generate_returns_image_bytes() {
        let client = MockHttpClient::new().with_bytes(TEST_URL, vec![0x89u8, b'P', b'N', b'G']);
        let generator = ClipdropImageGenerator::new(client, "key");

        let bytes = generator.generate("a lighthouse at dusk").await.unwrap();
        assert_eq!(bytes.len(), 4);

        let (_, fields) = generator.client.requests().remove(0);
        assert_eq!(fields["prompt"], "a lighthouse at dusk");
    }

    #[tokio::test]
    async fn test_generate_empty_body_is_invalid() {
        let client = MockHttpClient::new().with_bytes(TEST_URL, Vec::<u8>::new());
        let generator = ClipdropImageGenerator::new(client, "key");

        let err = generator.generate("x").await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::InvalidResponse);
    }

    #[tokio::test]
    async fn test_generate_out_of_credits() {
        let client = MockHttpClient::new().with_error(
            TEST_URL,
            ProviderError::quota_exhausted(PROVIDER, "no credits").with_status(402),
        );
        let generator = ClipdropImageGenerator::new(client, "key");

        let err = generator.generate("x").await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::QuotaExhausted);
    }
}
