use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;

use crate::domain::{ProviderError, ProviderErrorKind};

/// Trait for HTTP client operations (for mocking)
#[async_trait]
pub trait HttpClientTrait: Send + Sync + std::fmt::Debug {
    async fn post_json(
        &self,
        provider: &str,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;

    /// Multipart POST with text fields, returning the raw response body
    async fn post_form(
        &self,
        provider: &str,
        url: &str,
        headers: Vec<(&str, &str)>,
        fields: Vec<(String, String)>,
    ) -> Result<Bytes, ProviderError>;

    async fn get_json(
        &self,
        provider: &str,
        url: &str,
        headers: Vec<(&str, &str)>,
    ) -> Result<serde_json::Value, ProviderError>;

    async fn patch_json(
        &self,
        provider: &str,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Google-style APIs return either `{"error":{...}}` or `[{"error":{...}}]`
fn parse_error_body(body: &str) -> Option<ErrorBody> {
    let envelope = match serde_json::from_str::<serde_json::Value>(body).ok()? {
        serde_json::Value::Array(items) => items.into_iter().next()?,
        object @ serde_json::Value::Object(_) => object,
        _ => return None,
    };

    match envelope.get("error") {
        Some(error) if error.is_object() => serde_json::from_value::<ErrorEnvelope>(envelope)
            .ok()
            .map(|envelope| envelope.error),
        _ => None,
    }
}

/// Map a non-success response onto a typed provider error
pub fn classify_error(provider: &str, status: u16, body: &str) -> ProviderError {
    let parsed = parse_error_body(body);

    let kind = match (status, parsed.as_ref().and_then(|e| e.status.as_deref())) {
        (429, Some("RESOURCE_EXHAUSTED")) => ProviderErrorKind::QuotaExhausted,
        _ => ProviderErrorKind::from_status(status),
    };

    let message = parsed
        .and_then(|e| e.message)
        .unwrap_or_else(|| truncate(body, 512));

    ProviderError::new(provider, kind, message).with_status(status)
}

fn truncate(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }

    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

fn transport_error(provider: &str, e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        return ProviderError::other(provider, format!("Request timed out: {}", e));
    }
    ProviderError::other(provider, format!("Request failed: {}", e))
}

/// Real HTTP client using reqwest
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(timeout: std::time::Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::other("http", format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn send(
        &self,
        provider: &str,
        mut request: reqwest::RequestBuilder,
        headers: Vec<(&str, &str)>,
    ) -> Result<reqwest::Response, ProviderError> {
        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(provider, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_body = response.text().await.unwrap_or_default();
            return Err(classify_error(provider, status, &error_body));
        }

        Ok(response)
    }

    async fn read_json(
        provider: &str,
        response: reqwest::Response,
    ) -> Result<serde_json::Value, ProviderError> {
        response.json().await.map_err(|e| {
            ProviderError::invalid_response(provider, format!("Failed to parse response: {}", e))
        })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn post_json(
        &self,
        provider: &str,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let response = self
            .send(provider, self.client.post(url).json(body), headers)
            .await?;
        Self::read_json(provider, response).await
    }

    async fn post_form(
        &self,
        provider: &str,
        url: &str,
        headers: Vec<(&str, &str)>,
        fields: Vec<(String, String)>,
    ) -> Result<Bytes, ProviderError> {
        let form = fields
            .into_iter()
            .fold(reqwest::multipart::Form::new(), |form, (name, value)| {
                form.text(name, value)
            });

        let response = self
            .send(provider, self.client.post(url).multipart(form), headers)
            .await?;

        response.bytes().await.map_err(|e| {
            ProviderError::invalid_response(provider, format!("Failed to read response: {}", e))
        })
    }

    async fn get_json(
        &self,
        provider: &str,
        url: &str,
        headers: Vec<(&str, &str)>,
    ) -> Result<serde_json::Value, ProviderError> {
        let response = self.send(provider, self.client.get(url), headers).await?;
        Self::read_json(provider, response).await
    }

    async fn patch_json(
        &self,
        provider: &str,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let response = self
            .send(provider, self.client.patch(url).json(body), headers)
            .await?;
        Self::read_json(provider, response).await
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::RwLock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Canned responses keyed by URL
    #[derive(Debug)]
    pub struct MockHttpClient {
        responses: RwLock<HashMap<String, serde_json::Value>>,
        bytes_responses: RwLock<HashMap<String, Bytes>>,
        errors: RwLock<HashMap<String, ProviderError>>,
        requests: RwLock<Vec<(String, serde_json::Value)>>,
        calls: AtomicUsize,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self {
                responses: RwLock::new(HashMap::new()),
                bytes_responses: RwLock::new(HashMap::new()),
                errors: RwLock::new(HashMap::new()),
                requests: RwLock::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn with_response(self, url: impl Into<String>, response: serde_json::Value) -> Self {
            self.responses.write().unwrap().insert(url.into(), response);
            self
        }

        pub fn with_bytes(self, url: impl Into<String>, body: impl Into<Bytes>) -> Self {
            self.bytes_responses
                .write()
                .unwrap()
                .insert(url.into(), body.into());
            self
        }

        pub fn with_error(self, url: impl Into<String>, error: ProviderError) -> Self {
            self.errors.write().unwrap().insert(url.into(), error);
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Bodies sent so far; form fields are recorded as a JSON object
        pub fn requests(&self) -> Vec<(String, serde_json::Value)> {
            self.requests.read().unwrap().clone()
        }

        fn record(&self, url: &str, body: serde_json::Value) -> Result<(), ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.write().unwrap().push((url.to_string(), body));

            match self.errors.read().unwrap().get(url) {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        }

        fn json_for(&self, provider: &str, url: &str) -> Result<serde_json::Value, ProviderError> {
            self.responses
                .read()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| ProviderError::other(provider, format!("No mock response for {}", url)))
        }
    }

    impl Default for MockHttpClient {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl HttpClientTrait for MockHttpClient {
        async fn post_json(
            &self,
            provider: &str,
            url: &str,
            _headers: Vec<(&str, &str)>,
            body: &serde_json::Value,
        ) -> Result<serde_json::Value, ProviderError> {
            self.record(url, body.clone())?;
            self.json_for(provider, url)
        }

        async fn post_form(
            &self,
            provider: &str,
            url: &str,
            _headers: Vec<(&str, &str)>,
            fields: Vec<(String, String)>,
        ) -> Result<Bytes, ProviderError> {
            let body = fields
                .into_iter()
                .map(|(k, v)| (k, serde_json::Value::String(v)))
                .collect::<serde_json::Map<_, _>>();
            self.record(url, serde_json::Value::Object(body))?;

            if let Some(bytes) = self.bytes_responses.read().unwrap().get(url) {
                return Ok(bytes.clone());
            }

            let json = self.json_for(provider, url)?;
            Ok(Bytes::from(json.to_string()))
        }

        async fn get_json(
            &self,
            provider: &str,
            url: &str,
            _headers: Vec<(&str, &str)>,
        ) -> Result<serde_json::Value, ProviderError> {
            self.record(url, serde_json::Value::Null)?;
            self.json_for(provider, url)
        }

        async fn patch_json(
            &self,
            provider: &str,
            url: &str,
            _headers: Vec<(&str, &str)>,
            body: &serde_json::Value,
        ) -> Result<serde_json::Value, ProviderError> {
            self.record(url, body.clone())?;
            self.json_for(provider, url)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::domain::{with_retry, RetryPolicy};
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_classify_resource_exhausted_as_quota() {
        let body = json!({"error": {"code": 429, "message": "Quota exceeded for metric", "status": "RESOURCE_EXHAUSTED"}});
        let err = classify_error("gemini", 429, &body.to_string());

        assert_eq!(err.kind, ProviderErrorKind::QuotaExhausted);
        assert_eq!(err.status, Some(429));
        assert_eq!(err.message, "Quota exceeded for metric");
    }

    #[test]
    fn test_classify_array_error_body() {
        let body = json!([{"error": {"code": 429, "message": "quota", "status": "RESOURCE_EXHAUSTED"}}]);
        let err = classify_error("gemini", 429, &body.to_string());
        assert_eq!(err.kind, ProviderErrorKind::QuotaExhausted);
    }

    #[test]
    fn test_classify_array_error_body_keeps_message() {
        let body = r#"[{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}]"#;
        let err = classify_error("gemini", 429, body);

        assert_eq!(err.kind, ProviderErrorKind::QuotaExhausted);
        assert!(!err.is_transient());
        assert_eq!(err.message, "Quota exceeded");
    }

    #[test]
    fn test_parse_error_body_ignores_non_object_error() {
        assert!(parse_error_body(r#"{"error":"boom"}"#).is_none());
        assert!(parse_error_body(r#"[]"#).is_none());
        assert!(parse_error_body("not json").is_none());
    }

    #[test]
    fn test_classify_plain_429_as_rate_limited() {
        let err = classify_error("clipdrop", 429, "Too many requests");
        assert_eq!(err.kind, ProviderErrorKind::RateLimited);
        assert_eq!(err.message, "Too many requests");
    }

    #[test]
    fn test_classify_other_statuses() {
        assert_eq!(classify_error("x", 503, "").kind, ProviderErrorKind::Overloaded);
        assert_eq!(classify_error("x", 401, "").kind, ProviderErrorKind::Unauthorized);
        assert_eq!(classify_error("x", 402, "").kind, ProviderErrorKind::QuotaExhausted);
        assert_eq!(classify_error("x", 500, "").kind, ProviderErrorKind::Other);
    }

    #[test]
    fn test_truncate_long_body() {
        let body = "é".repeat(400);
        let out = truncate(&body, 11);
        assert!(out.ends_with("..."));
        assert!(out.len() <= 14);
    }

    #[tokio::test]
    async fn test_post_json_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer k"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let client = HttpClient::new();
        let value = client
            .post_json(
                "gemini",
                &format!("{}/chat/completions", server.uri()),
                vec![("Authorization", "Bearer k")],
                &json!({}),
            )
            .await
            .unwrap();

        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn test_post_json_maps_503() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = HttpClient::new()
            .post_json("gemini", &server.uri(), vec![], &json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ProviderErrorKind::Overloaded);
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_timeout_is_terminal_and_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": true}))
                    .set_delay(std::time::Duration::from_millis(300)),
            )
            .mount(&server)
            .await;

        let client = HttpClient::with_timeout(std::time::Duration::from_millis(20)).unwrap();
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3).with_base_delay(1).with_max_jitter(0);
        let url = server.uri();
        let body = json!({});

        let (client, calls, url, body) = (&client, &calls, url.as_str(), &body);
        let err = with_retry(&policy, "timeout", move || {
            calls.fetch_add(1, Ordering::SeqCst);
            client.post_json("gemini", url, vec![], body)
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind, ProviderErrorKind::Other);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_post_form_returns_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/text-to-image/v1"))
            .and(header("x-api-key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89u8, b'P', b'N', b'G']))
            .mount(&server)
            .await;

        let bytes = HttpClient::new()
            .post_form(
                "clipdrop",
                &format!("{}/text-to-image/v1", server.uri()),
                vec![("x-api-key", "secret")],
                vec![("prompt".to_string(), "a cat".to_string())],
            )
            .await
            .unwrap();

        assert_eq!(&bytes[..], &[0x89u8, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_get_json_maps_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"error": {"message": "forbidden"}})))
            .mount(&server)
            .await;

        let err = HttpClient::new()
            .get_json("clerk", &server.uri(), vec![])
            .await
            .unwrap_err();

        assert_eq!(err.kind, ProviderErrorKind::Unauthorized);
        assert_eq!(err.message, "forbidden");
    }
}
