//! History endpoints (history list view)

use axum::{extract::State, routing::get, Json, Router};
use lens_common::HistoryEntry;
use serde::Serialize;
use tracing::error;

use crate::{ApiError, ApiResult, AppState};

pub const HISTORY_LOAD_FAILED: &str = "Failed to load history.";

/// Response payload for GET /api/history
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Most recent first
    pub entries: Vec<HistoryEntryView>,
    /// Inline message when storage could not be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryEntryView {
    pub tree_id: String,
    pub name: String,
    pub scientific_name: String,
    pub detail_path: String,
}

impl From<HistoryEntry> for HistoryEntryView {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            detail_path: format!("/api/trees/{}", entry.species_id),
            tree_id: entry.species_id,
            name: entry.common_name,
            scientific_name: entry.scientific_name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: bool,
}

/// GET /api/history
///
/// Storage failures are reported inline with an empty list, never as an
/// HTTP error.
pub async fn list_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    match state.ledger.read_all().await {
        Ok(entries) => Json(HistoryResponse {
            entries: entries.into_iter().map(HistoryEntryView::from).collect(),
            error: None,
        }),
        Err(e) => {
            error!(error = %e, "Failed to load history");
            state.record_error(e.to_string()).await;
            Json(HistoryResponse {
                entries: Vec::new(),
                error: Some(HISTORY_LOAD_FAILED.to_string()),
            })
        }
    }
}

/// DELETE /api/history
pub async fn clear_history(State(state): State<AppState>) -> ApiResult<Json<ClearResponse>> {
    state.ledger.clear().await.map_err(|e| {
        error!(error = %e, "Failed to clear history");
        ApiError::Internal("Failed to clear history.".to_string())
    })?;
    Ok(Json(ClearResponse { cleared: true }))
}

/// Build history routes
pub fn history_routes() -> Router<AppState> {
    Router::new().route("/api/history", get(list_history).delete(clear_history))
}
