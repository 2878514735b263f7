//! AI Studio Gateway
//!
//! Authenticated proxy to generative text, image and document services with:
//! - Per-user free/premium usage quotas with atomic reservation
//! - Bounded retry of transient provider failures
//! - Generation history with likes
//! - In-memory or PostgreSQL storage

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use api::state::AppState;
use config::{IdentityMode, QuotaBackend, StorageBackend};
use domain::{CreationRepository, IdentityProvider, QuotaGate, QuotaStore};
use infrastructure::{
    creation::{InMemoryCreationRepository, PostgresCreationRepository},
    document::PdfTextExtractor,
    http::HttpClient,
    identity::{ClerkBackendClient, ClerkIdentityProvider, SharedSecretIdentityProvider},
    llm::GeminiProvider,
    media::{ClipdropImageGenerator, CloudinaryCredentials, CloudinaryMediaStore},
    quota::{IdentityMetadataQuotaStore, InMemoryQuotaStore, PostgresQuotaStore},
    services::{CreationService, FeatureProviders, FeatureService, QuotaService, UsageService},
    storage::{connect_pool, run_storage_migrations, PostgresConfig},
};
use sqlx::PgPool;
use tracing::info;

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    config.validate()?;

    let http = HttpClient::with_timeout(Duration::from_secs(config.providers.timeout_secs))?;

    let needs_postgres = config.storage.backend == StorageBackend::Postgres
        || config.quota.backend == QuotaBackend::Postgres;

    let pool = if needs_postgres {
        let pool = connect_storage(config).await?;
        if config.storage.run_migrations {
            run_storage_migrations(&pool).await?;
        }
        Some(pool)
    } else {
        None
    };

    info!(
        storage = ?config.storage.backend,
        quota = ?config.quota.backend,
        enforcement = ?config.quota.enforcement,
        identity = ?config.identity.mode,
        "Selecting backends"
    );

    let creations: Arc<dyn CreationRepository> = match (config.storage.backend, &pool) {
        (StorageBackend::Postgres, Some(pool)) => Arc::new(PostgresCreationRepository::new(pool.clone())),
        _ => Arc::new(InMemoryCreationRepository::new()),
    };

    let quota_store: Arc<dyn QuotaStore> = match (config.quota.backend, &pool) {
        (QuotaBackend::Postgres, Some(pool)) => Arc::new(PostgresQuotaStore::new(pool.clone())),
        (QuotaBackend::Identity, _) => Arc::new(IdentityMetadataQuotaStore::new(
            ClerkBackendClient::with_base_url(
                http.clone(),
                require_env("CLERK_SECRET_KEY")?,
                config.providers.clerk_api_url.clone(),
            ),
        )),
        _ => Arc::new(InMemoryQuotaStore::new()),
    };

    let identity: Arc<dyn IdentityProvider> = match config.identity.mode {
        IdentityMode::Clerk => Arc::new(ClerkIdentityProvider::new(
            http.clone(),
            require_env("CLERK_JWKS_URL")?,
            Duration::from_secs(config.identity.jwks_cache_ttl_secs),
        )),
        IdentityMode::SharedSecret => Arc::new(SharedSecretIdentityProvider::new(&require_env(
            "AUTH_SHARED_SECRET",
        )?)),
    };

    let providers = FeatureProviders {
        llm: Arc::new(GeminiProvider::with_base_url(
            http.clone(),
            require_env("GEMINI_API_KEY")?,
            config.providers.gemini_base_url.clone(),
        )),
        images: Arc::new(ClipdropImageGenerator::with_base_url(
            http.clone(),
            require_env("CLIPDROP_API_KEY")?,
            config.providers.clipdrop_base_url.clone(),
        )),
        media: Arc::new(
            CloudinaryMediaStore::new(
                http.clone(),
                CloudinaryCredentials {
                    cloud_name: require_env("CLOUDINARY_CLOUD_NAME")?,
                    api_key: require_env("CLOUDINARY_API_KEY")?,
                    api_secret: require_env("CLOUDINARY_API_SECRET")?,
                },
            )
            .with_api_url(config.providers.cloudinary_api_url.clone()),
        ),
        documents: Arc::new(PdfTextExtractor::new()),
    };

    let quota = QuotaService::new(quota_store.clone(), QuotaGate::new(config.quota.limits.clone()))
        .with_enforcement(config.quota.enforcement)
        .with_max_cas_attempts(config.quota.max_cas_attempts);

    let features = FeatureService::new(Arc::new(quota), providers, creations.clone())
        .with_retry_policy(config.retry.clone())
        .with_config(config.features.clone());

    Ok(AppState::new(
        Arc::new(features),
        Arc::new(CreationService::new(creations)),
        Arc::new(UsageService::new(quota_store, config.quota.limits.clone())),
        identity,
    ))
}

/// Open the PostgreSQL pool from `DATABASE_URL`
pub async fn connect_storage(config: &AppConfig) -> anyhow::Result<PgPool> {
    let pg_config = PostgresConfig::new(require_env("DATABASE_URL")?)
        .with_max_connections(config.storage.max_connections)
        .with_min_connections(config.storage.min_connections);

    info!("Connecting to PostgreSQL...");
    let pool = connect_pool(&pg_config).await?;
    info!("PostgreSQL connection established");

    Ok(pool)
}

fn require_env(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("{} environment variable is required", name))
}
