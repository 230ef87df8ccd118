//! lens-identify library interface
//!
//! Exposes the identification service (capture flow, classification
//! resolution, history ledger, tree details) for the binary and for
//! integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::capture_flow::CaptureFlow;
use crate::services::classifier_client::SharedApiKey;
use crate::services::history_ledger::HistoryLedger;
use crate::services::tree_detail_client::TreeDetailSource;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (settings + history slot)
    pub db: SqlitePool,
    /// Bounded, deduplicated history of identified species
    pub ledger: Arc<HistoryLedger>,
    /// Capture/upload identification flow
    pub capture: Arc<CaptureFlow>,
    /// Remote tree-detail backend
    pub details: Arc<dyn TreeDetailSource>,
    /// Classifier API key, updated by the settings endpoint
    pub classifier_key: SharedApiKey,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        ledger: Arc<HistoryLedger>,
        capture: Arc<CaptureFlow>,
        details: Arc<dyn TreeDetailSource>,
        classifier_key: SharedApiKey,
    ) -> Self {
        Self {
            db,
            ledger,
            capture,
            details,
            classifier_key,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Remember a failure for the health endpoint
    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::identify_routes())
        .merge(api::history_routes())
        .merge(api::tree_routes())
        .merge(api::settings_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
