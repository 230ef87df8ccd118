//! Settings database operations
//!
//! Get/set accessors for the key/value `settings` table. The history ledger
//! uses the raw accessors to read and replace its single slot.

use lens_common::{Error, Result};
use sqlx::{Pool, Sqlite};

/// Settings key holding the classifier API key
pub const CLASSIFIER_API_KEY: &str = "classifier_api_key";

/// Get classifier API key from database
///
/// **Returns:** Some(key) if exists, None if not set
pub async fn get_classifier_api_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting(db, CLASSIFIER_API_KEY).await
}

/// Set classifier API key in database
pub async fn set_classifier_api_key(db: &Pool<Sqlite>, key: String) -> Result<()> {
    set_setting(db, CLASSIFIER_API_KEY, key).await
}

/// Read the raw stored value of a setting
///
/// A row with a NULL value reads the same as a missing row.
pub async fn get_setting(db: &Pool<Sqlite>, key: &str) -> Result<Option<String>> {
    let row: Option<(Option<String>,)> = sqlx::query_as(
        "SELECT value FROM settings WHERE key = ?"
    )
    .bind(key)
    .fetch_optional(db)
    .await
    .map_err(Error::Database)?;

    Ok(row.and_then(|(value,)| value))
}

/// Replace the stored value of a setting
///
/// Single UPSERT statement, so readers never see a partial write.
pub async fn set_setting(db: &Pool<Sqlite>, key: &str, value: impl std::fmt::Display) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

/// Remove a setting entirely
pub async fn delete_setting(db: &Pool<Sqlite>, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM settings WHERE key = ?")
        .bind(key)
        .execute(db)
        .await
        .map_err(Error::Database)?;

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
