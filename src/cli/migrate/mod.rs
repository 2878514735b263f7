//! Migrate command - applies or reverts database migrations

use tracing::info;

use crate::config::AppConfig;
use crate::infrastructure::logging::{init_logging, LoggingConfig};
use crate::infrastructure::storage::{Migrator, PostgresMigrator};

pub async fn run(revert: bool) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_logging(&LoggingConfig::from(&config.logging));

    let pool = crate::connect_storage(&config).await?;
    let migrator = PostgresMigrator::new(pool);

    if revert {
        migrator.revert().await?;
    } else {
        migrator.run().await?;
    }

    let version = migrator.version().await?;
    info!(version = ?version, "Migrations complete");
    Ok(())
}
