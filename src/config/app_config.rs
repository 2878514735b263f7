use serde::Deserialize;

use crate::domain::{QuotaLimits, RetryPolicy};
use crate::infrastructure::observability::ObservabilityConfig;
use crate::infrastructure::services::{Enforcement, FeatureConfig};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Transport ceiling; per-file limits are enforced by the features
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Apply pending migrations when the server starts
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

/// Where usage counters live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuotaBackend {
    #[default]
    Memory,
    Postgres,
    /// Private metadata of the identity provider's user record
    Identity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuotaConfig {
    #[serde(default)]
    pub backend: QuotaBackend,
    #[serde(default)]
    pub enforcement: Enforcement,
    #[serde(default)]
    pub limits: QuotaLimits,
    #[serde(default = "default_max_cas_attempts")]
    pub max_cas_attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdentityMode {
    #[default]
    Clerk,
    SharedSecret,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub mode: IdentityMode,
    #[serde(default = "default_jwks_cache_ttl")]
    pub jwks_cache_ttl_secs: u64,
}

/// Third-party endpoints; secrets come from the environment
#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    #[serde(default = "default_clipdrop_base_url")]
    pub clipdrop_base_url: String,
    #[serde(default = "default_cloudinary_api_url")]
    pub cloudinary_api_url: String,
    #[serde(default = "default_clerk_api_url")]
    pub clerk_api_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_body_limit() -> usize {
    12 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_max_cas_attempts() -> u32 {
    16
}

fn default_jwks_cache_ttl() -> u64 {
    3600
}

fn default_gemini_base_url() -> String {
    crate::infrastructure::llm::DEFAULT_GEMINI_BASE_URL.to_string()
}

fn default_clipdrop_base_url() -> String {
    crate::infrastructure::media::DEFAULT_CLIPDROP_BASE_URL.to_string()
}

fn default_cloudinary_api_url() -> String {
    crate::infrastructure::media::DEFAULT_CLOUDINARY_API_URL.to_string()
}

fn default_clerk_api_url() -> String {
    crate::infrastructure::identity::DEFAULT_CLERK_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            run_migrations: default_true(),
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            backend: QuotaBackend::default(),
            enforcement: Enforcement::default(),
            limits: QuotaLimits::default(),
            max_cas_attempts: default_max_cas_attempts(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            mode: IdentityMode::default(),
            jwks_cache_ttl_secs: default_jwks_cache_ttl(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            gemini_base_url: default_gemini_base_url(),
            clipdrop_base_url: default_clipdrop_base_url(),
            cloudinary_api_url: default_cloudinary_api_url(),
            clerk_api_url: default_clerk_api_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app: Self = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    /// Reject combinations the backends cannot honour
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        self.quota.validate()
    }
}

impl QuotaConfig {
    /// The identity backend has no conditional write, so it cannot hold a strict reservation
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.backend == QuotaBackend::Identity && self.enforcement == Enforcement::Strict {
            return Err(config::ConfigError::Message(
                "quota.backend = \"identity\" requires quota.enforcement = \"best_effort\"".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.body_limit_bytes, 12 * 1024 * 1024);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.quota.enforcement, Enforcement::Strict);
        assert_eq!(config.quota.max_cas_attempts, 16);
        assert_eq!(config.quota.limits.background_removal, 5);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.identity.mode, IdentityMode::Clerk);
    }

    #[test]
    fn test_identity_backend_requires_best_effort() {
        let mut config = AppConfig::default();
        config.quota.backend = QuotaBackend::Identity;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("best_effort"));

        config.quota.enforcement = Enforcement::BestEffort;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_strict_allowed_on_atomic_backends() {
        let mut config = AppConfig::default();
        for backend in [QuotaBackend::Memory, QuotaBackend::Postgres] {
            config.quota.backend = backend;
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let source = r#"
            [server]
            port = 8080

            [quota]
            backend = "postgres"
            enforcement = "best_effort"

            [quota.limits]
            article = 3

            [identity]
            mode = "shared_secret"
        "#;

        let config: AppConfig = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.quota.backend, QuotaBackend::Postgres);
        assert_eq!(config.quota.enforcement, Enforcement::BestEffort);
        assert_eq!(config.quota.limits.article, 3);
        assert_eq!(config.quota.limits.image, 5);
        assert_eq!(config.identity.mode, IdentityMode::SharedSecret);
        assert_eq!(config.features.article_model, "gemini-1.5-flash");
    }
}
