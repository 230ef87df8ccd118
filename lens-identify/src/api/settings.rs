//! Settings API endpoint
//!
//! POST /api/settings/classifier_api_key stores the key in the database and
//! swaps it into the running classifier client.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{ApiError, ApiResult, AppState};

/// Request payload for setting the classifier API key
#[derive(Debug, Deserialize)]
pub struct SetApiKeyRequest {
    pub api_key: String,
}

/// Response payload for API key configuration
#[derive(Debug, Serialize)]
pub struct SetApiKeyResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/settings/classifier_api_key handler
///
/// **Errors:**
/// - 400 Bad Request: Empty or whitespace-only key
/// - 500 Internal Server Error: Database write failure (`COMMON_ERROR`)
pub async fn set_classifier_api_key(
    State(state): State<AppState>,
    Json(payload): Json<SetApiKeyRequest>,
) -> ApiResult<Json<SetApiKeyResponse>> {
    if !crate::config::is_valid_key(&payload.api_key) {
        return Err(ApiError::BadRequest(
            "API key cannot be empty or whitespace-only".to_string(),
        ));
    }

    let key = payload.api_key.trim().to_string();

    crate::db::settings::set_classifier_api_key(&state.db, key.clone()).await?;

    *state.classifier_key.write().await = Some(key);

    info!("Classifier API key configured via HTTP");

    Ok(Json(SetApiKeyResponse {
        success: true,
        message: "Classifier API key saved".to_string(),
    }))
}

/// Build settings routes
pub fn settings_routes() -> Router<AppState> {
    Router::new().route("/api/settings/classifier_api_key", post(set_classifier_api_key))
}
