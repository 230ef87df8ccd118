//! Identification endpoints (capture/upload view)

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::services::capture_flow::{user_message, CaptureError, IdentifyOutcome};
use crate::services::request_lifecycle::RequestState;
use crate::{ApiError, ApiResult, AppState};

/// Request payload for POST /api/identify
#[derive(Debug, Deserialize)]
pub struct IdentifyRequest {
    /// Base64 image, optionally as a `data:` URL
    pub image: String,
    /// Client session; a newer request of the same session supersedes this one
    #[serde(default)]
    pub session: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

/// POST /api/identify
///
/// **Responses:**
/// - 200 `{"outcome":"identified", "tree_id", "name", "scientific_name", "confidence", "detail_path"}`
/// - 200 `{"outcome":"not_identified", "message"}`
/// - 400 invalid image payload
/// - 409 request cancelled or superseded
/// - 502 classifier unreachable ("Failed to send image to AI model.")
pub async fn identify(
    State(state): State<AppState>,
    Json(payload): Json<IdentifyRequest>,
) -> ApiResult<Json<IdentifyOutcome>> {
    let session = payload
        .session
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let result = match session {
        Some(session) => state.capture.identify_tracked(session, &payload.image).await,
        None => state.capture.identify(&payload.image).await,
    };

    match result {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => {
            let message = user_message(&e).to_string();
            Err(match e {
                CaptureError::InvalidImage(detail) => {
                    ApiError::BadRequest(format!("{} ({})", message, detail))
                }
                CaptureError::Classification(cause) => {
                    state.record_error(cause.to_string()).await;
                    ApiError::BadGateway(message)
                }
                CaptureError::Cancelled | CaptureError::Superseded => ApiError::Conflict(message),
            })
        }
    }
}

/// GET /api/identify/:session
pub async fn request_state(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> ApiResult<Json<RequestState<IdentifyOutcome>>> {
    state
        .capture
        .tracker()
        .state(&session)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No request for session {}", session)))
}

/// DELETE /api/identify/:session
pub async fn cancel_request(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> Json<CancelResponse> {
    let cancelled = state.capture.tracker().cancel(&session).await;
    Json(CancelResponse { cancelled })
}

/// Build identification routes
pub fn identify_routes() -> Router<AppState> {
    Router::new()
        .route("/api/identify", post(identify))
        .route(
            "/api/identify/:session",
            get(request_state).delete(cancel_request),
        )
}
