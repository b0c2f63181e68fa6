use crate::{config::DatabaseConfig, errors::Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

/// Create a SQLite connection pool
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    tracing::info!("Creating database connection pool");

    // The file is only created when we are also allowed to lay down the schema
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(config.run_migrations);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
        .connect_with(options)
        .await?;

    tracing::info!(
        "Database connection pool created with {} max connections",
        config.max_connections
    );

    Ok(pool)
}

/// Run database migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    tracing::info!("Running database migrations");
    sqlx::migrate!("./src/db/migrations").run(pool).await?;
    tracing::info!("Database migrations completed");
    Ok(())
}
