use crate::pool::DbPool;
use anyhow::{Context, Result};
use tracing::info;

// Migration SQL under src/migrations/sql is compiled into the binary.
refinery::embed_migrations!("src/migrations/sql");

/// Apply any pending schema migrations.
pub async fn run(pool: &DbPool) -> Result<()> {
    let mut client = pool
        .get()
        .await
        .context("Failed to get database connection for migrations")?;

    let report = migrations::runner()
        .run_async(&mut **client)
        .await
        .context("Failed to run migrations")?;

    for migration in report.applied_migrations() {
        info!(migration = %migration.name(), "Schema migration applied");
    }

    info!("Database schema is up to date");
    Ok(())
}
