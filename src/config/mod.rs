mod app_config;

pub use app_config::{
    AppConfig, IdentityConfig, IdentityMode, LogFormat, LoggingConfig, ProvidersConfig, QuotaBackend,
    QuotaConfig, ServerConfig, StorageBackend, StorageConfig,
};
