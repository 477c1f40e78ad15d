use anyhow::{Context, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

/// Open the database and bring the schema up to date.
pub async fn connect(url: &str) -> Result<DatabaseConnection> {
    let mut opts = ConnectOptions::new(url);
    opts.sqlx_logging_level(log::LevelFilter::Debug);
    open(opts).await
}

async fn open(opts: ConnectOptions) -> Result<DatabaseConnection> {
    let url = opts.get_url().to_string();
    let db = Database::connect(opts)
        .await
        .with_context(|| format!("failed to connect to `{url}`"))?;
    Migrator::up(&db, None)
        .await
        .with_context(|| "failed to run migrations")?;
    Ok(db)
}

/// Fresh in-memory database with the schema applied.
#[cfg(test)]
pub async fn memory() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    // every pooled connection would otherwise get its own empty database
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    open(opts).await.unwrap()
}
