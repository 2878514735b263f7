use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::domain::{ImageEffect, MediaStore, ProviderError, StoredMedia, UploadedFile};
use crate::infrastructure::http::HttpClientTrait;

pub const DEFAULT_CLOUDINARY_API_URL: &str = "https://api.cloudinary.com";
pub const DEFAULT_CLOUDINARY_DELIVERY_URL: &str = "https://res.cloudinary.com";

const PROVIDER: &str = "cloudinary";

/// Cloudinary account credentials
#[derive(Debug, Clone)]
pub struct CloudinaryCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Cloudinary signed uploads and effect URLs
#[derive(Debug)]
pub struct CloudinaryMediaStore<C: HttpClientTrait> {
    client: C,
    credentials: CloudinaryCredentials,
    api_url: String,
    delivery_url: String,
}

impl<C: HttpClientTrait> CloudinaryMediaStore<C> {
    pub fn new(client: C, credentials: CloudinaryCredentials) -> Self {
        Self {
            client,
            credentials,
            api_url: DEFAULT_CLOUDINARY_API_URL.to_string(),
            delivery_url: DEFAULT_CLOUDINARY_DELIVERY_URL.to_string(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/v1_1/{}/image/upload",
            self.api_url, self.credentials.cloud_name
        )
    }

    fn form_fields(&self, file: &UploadedFile, timestamp: i64) -> Vec<(String, String)> {
        let timestamp = timestamp.to_string();
        let signature = sign(&[("timestamp", timestamp.as_str())], &self.credentials.api_secret);

        vec![
            ("file".to_string(), data_uri(file)),
            ("api_key".to_string(), self.credentials.api_key.clone()),
            ("timestamp".to_string(), timestamp),
            ("signature".to_string(), signature),
            ("signature_algorithm".to_string(), "sha256".to_string()),
        ]
    }
}

/// Hex SHA-256 of the `&`-joined, key-sorted params followed by the secret
pub fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn data_uri(file: &UploadedFile) -> String {
    format!(
        "data:{};base64,{}",
        file.content_type,
        base64::engine::general_purpose::STANDARD.encode(&file.data)
    )
}

fn effect_segment(effect: &ImageEffect) -> String {
    match effect {
        ImageEffect::BackgroundRemoval => "e_background_removal".to_string(),
        ImageEffect::ObjectRemoval { object } => {
            format!("e_gen_remove:prompt_{}", urlencoding::encode(object))
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
}

#[async_trait]
impl<C: HttpClientTrait> MediaStore for CloudinaryMediaStore<C> {
    async fn upload(&self, file: UploadedFile) -> Result<StoredMedia, ProviderError> {
        let fields = self.form_fields(&file, chrono::Utc::now().timestamp());
        let body = self
            .client
            .post_form(PROVIDER, &self.upload_url(), vec![], fields)
            .await?;

        let response: UploadResponse = serde_json::from_slice(&body).map_err(|e| {
            ProviderError::invalid_response(PROVIDER, format!("Failed to parse upload response: {}", e))
        })?;

        tracing::debug!(public_id = %response.public_id, bytes = file.size(), "Uploaded media");

        Ok(StoredMedia {
            public_id: response.public_id,
            secure_url: response.secure_url,
        })
    }

    fn transformed_url(&self, public_id: &str, effect: &ImageEffect) -> String {
        format!(
            "{}/{}/image/upload/{}/{}",
            self.delivery_url,
            self.credentials.cloud_name,
            effect_segment(effect),
            public_id
        )
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

    const UPLOAD_URL: &str = "https://api.cloudinary.com/v1_1/demo/image/upload";

    fn credentials() -> CloudinaryCredentials {
        CloudinaryCredentials {
            cloud_name: "demo".to_string(),
            api_key: "1234".to_string(),
            api_secret: "shh".to_string(),
        }
    }

    #[test]
    fn test_sign_sorts_params() {
        let a = sign(&[("timestamp", "1"), ("folder", "x")], "s");
        let b = sign(&[("folder", "x"), ("timestamp", "1")], "s");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_sign_known_value() {
        let mut hasher = Sha256::new();
        hasher.update(b"timestamp=1315060510shh");
        let expected = hex::encode(hasher.finalize());

        assert_eq!(sign(&[("timestamp", "1315060510")], "shh"), expected);
    }

    #[test]
    fn test_form_fields() {
        let store = CloudinaryMediaStore::new(MockHttpClient::new(), credentials());
        let file = UploadedFile::new("a.png", "image/png", vec![1u8, 2, 3]);

        let fields = store.form_fields(&file, 100);
        let get = |name: &str| {
            fields
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .unwrap()
        };

        assert_eq!(get("file"), "data:image/png;base64,AQID");
        assert_eq!(get("api_key"), "1234");
        assert_eq!(get("timestamp"), "100");
        assert_eq!(get("signature"), sign(&[("timestamp", "100")], "shh"));
    }

    #[test]
    fn test_transformed_urls() {
        let store = CloudinaryMediaStore::new(MockHttpClient::new(), credentials());

        assert_eq!(
            store.transformed_url("abc", &ImageEffect::BackgroundRemoval),
            "https://res.cloudinary.com/demo/image/upload/e_background_removal/abc"
        );
        assert_eq!(
            store.transformed_url(
                "abc",
                &ImageEffect::ObjectRemoval {
                    object: "car".to_string()
                }
            ),
            "https://res.cloudinary.com/demo/image/upload/e_gen_remove:prompt_car/abc"
        );
    }

    #[test]
    fn test_object_prompt_is_percent_encoded() {
        assert_eq!(
            effect_segment(&ImageEffect::ObjectRemoval {
                object: "café".to_string()
            }),
            "e_gen_remove:prompt_caf%C3%A9"
        );
    }

    #[tokio::test]
    async fn test_upload_parses_response() {
        let client = MockHttpClient::new().with_response(
            UPLOAD_URL,
            serde_json::json!({
                "public_id": "sample",
                "secure_url": "https://res.cloudinary.com/demo/image/upload/v1/sample.png",
                "format": "png"
            }),
        );
        let store = CloudinaryMediaStore::new(client, credentials());

        let media = store
            .upload(UploadedFile::new("a.png", "image/png", vec![1u8]))
            .await
            .unwrap();

        assert_eq!(media.public_id, "sample");
        assert!(media.secure_url.ends_with("sample.png"));
    }

    #[tokio::test]
    async fn test_upload_bad_response() {
        let client = MockHttpClient::new().with_response(UPLOAD_URL, serde_json::json!({"oops": 1}));
        let store = CloudinaryMediaStore::new(client, credentials());

        let err = store
            .upload(UploadedFile::new("a.png", "image/png", vec![1u8]))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ProviderErrorKind::InvalidResponse);
    }
}
