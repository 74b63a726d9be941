use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use database::Database;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .init();

    let db_config = config::DatabaseConfig::from_env()
        .map_err(|e| anyhow!("Failed to load database config: {e}"))?;

    let database = Database::from_config(&db_config)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    database
        .run_migrations()
        .await
        .context("Failed to run migrations")?;

    apply_seed_scripts(&database).await
}

/// Execute every .sql file under src/seed in filename order. The scripts are
/// written to be idempotent, so rerunning the binary is safe.
async fn apply_seed_scripts(database: &Database) -> Result<()> {
    let seed_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/seed");

    let mut scripts: Vec<PathBuf> = fs::read_dir(&seed_dir)
        .with_context(|| format!("Failed to read seed directory {}", seed_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "sql"))
        .collect();
    scripts.sort();

    if scripts.is_empty() {
        info!("No seed scripts found, nothing to do");
        return Ok(());
    }

    info!(count = scripts.len(), "Applying seed scripts");

    let client = database
        .pool()
        .get()
        .await
        .context("Failed to get database connection")?;

    for script in scripts {
        let name = script
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let sql = fs::read_to_string(&script)
            .with_context(|| format!("Failed to read seed script {}", script.display()))?;

        client
            .batch_execute(&sql)
            .await
            .with_context(|| format!("Seed script {name} failed"))?;

        info!(script = %name, "Seed script applied");
    }

    info!("Database seeding completed");
    Ok(())
}
