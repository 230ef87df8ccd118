//! SQLite pool creation and schema setup

use crate::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open (or create) the database and ensure the schema exists
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    create_settings_table(&pool).await?;

    tracing::info!("Database tables initialized (settings)");
    Ok(pool)
}

/// Create the key/value `settings` table if it doesn't exist
///
/// Holds both runtime settings (classifier API key) and the serialized
/// history ledger slot.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
