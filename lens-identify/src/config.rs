//! Configuration resolution for lens-identify
//!
//! Classifier API key resolution with Database → ENV → TOML priority.

use lens_common::config::{TomlConfig, CLASSIFIER_API_KEY_ENV};
use lens_common::{Error, Result};
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};

/// Resolve the classifier API key from 3-tier configuration
///
/// **Priority:** Database → ENV → TOML
pub async fn resolve_classifier_api_key(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<String> {
    let db_key = crate::db::settings::get_classifier_api_key(db)
        .await?
        .filter(|key| is_valid_key(key));
    let env_key = std::env::var(CLASSIFIER_API_KEY_ENV)
        .ok()
        .filter(|key| is_valid_key(key));
    let toml_key = toml_config
        .classifier
        .api_key
        .clone()
        .filter(|key| is_valid_key(key));

    let sources: Vec<&str> = [
        db_key.as_ref().map(|_| "database"),
        env_key.as_ref().map(|_| "environment"),
        toml_key.as_ref().map(|_| "TOML"),
    ]
    .into_iter()
    .flatten()
    .collect();

    // Multiple sources usually mean a stale copy somewhere
    if sources.len() > 1 {
        warn!(
            "Classifier API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(key) = db_key {
        info!("Classifier API key loaded from database");
        return Ok(key);
    }

    if let Some(key) = env_key {
        info!("Classifier API key loaded from environment variable");
        return Ok(key);
    }

    if let Some(key) = toml_key {
        info!("Classifier API key loaded from TOML config");
        return Ok(key);
    }

    Err(Error::Config(format!(
        "Classifier API key not configured. Please configure using one of:\n\
         1. HTTP: POST /api/settings/classifier_api_key {{\"api_key\": \"...\"}}\n\
         2. Environment: {}=your-key-here\n\
         3. TOML config: [classifier] api_key = \"your-key\"",
        CLASSIFIER_API_KEY_ENV
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
