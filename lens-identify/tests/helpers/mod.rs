//! Shared test helpers: in-memory database, scripted classifier and
//! tree-detail fakes, application state builder.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use lens_common::DuplicatePolicy;
use lens_identify::services::classifier_client::{Classifier, ClassifierError, SharedApiKey};
use lens_identify::services::resolver::Prediction;
use lens_identify::services::tree_detail_client::{DetailError, TreeDetailSource, TreeRecord};
use lens_identify::services::{CaptureFlow, HistoryLedger};
use lens_identify::AppState;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

pub const MAX_IMAGE_BYTES: usize = 1024 * 1024;

/// "hello" in base64, stands in for a leaf photo
pub const IMAGE: &str = "aGVsbG8=";

/// Single-connection in-memory database with the settings table
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Should open in-memory database");
    lens_common::db::create_settings_table(&pool)
        .await
        .expect("Should create settings table");
    pool
}

/// What the scripted classifier answers
#[derive(Clone)]
pub enum Script {
    Predictions(Vec<Prediction>),
    NetworkDown,
}

/// Classifier returning a fixed answer after an optional delay
pub struct ScriptedClassifier {
    script: Script,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn answering(predictions: Vec<Prediction>) -> Self {
        Self {
            script: Script::Predictions(predictions),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            script: Script::NetworkDown,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, _image_base64: &str) -> Result<Vec<Prediction>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.script {
            Script::Predictions(predictions) => Ok(predictions.clone()),
            Script::NetworkDown => Err(ClassifierError::NetworkError(
                "connection refused".to_string(),
            )),
        }
    }
}

/// Tree-detail source backed by a map; missing ids fail
#[derive(Default)]
pub struct MapDetails {
    records: HashMap<String, TreeRecord>,
}

impl MapDetails {
    pub fn with(mut self, tree_id: &str, record: TreeRecord) -> Self {
        self.records.insert(tree_id.to_string(), record);
        self
    }
}

#[async_trait]
impl TreeDetailSource for MapDetails {
    async fn fetch(&self, tree_id: &str) -> Result<TreeRecord, DetailError> {
        self.records
            .get(tree_id)
            .cloned()
            .ok_or_else(|| DetailError::NetworkError("backend unreachable".to_string()))
    }
}

pub fn narra(confidence: f64) -> Prediction {
    Prediction::new("narra", confidence)
}

pub fn capture_flow(
    classifier: Arc<dyn Classifier>,
    ledger: Arc<HistoryLedger>,
) -> Arc<CaptureFlow> {
    Arc::new(CaptureFlow::new(classifier, ledger, MAX_IMAGE_BYTES))
}

/// Application state over the given pool and fakes
pub fn app_state(
    db: SqlitePool,
    classifier: Arc<dyn Classifier>,
    details: Arc<dyn TreeDetailSource>,
) -> AppState {
    let ledger = Arc::new(HistoryLedger::new(db.clone(), DuplicatePolicy::KeepPosition));
    let capture = capture_flow(classifier, ledger.clone());
    let key: SharedApiKey = Arc::new(RwLock::new(None));
    AppState::new(db, ledger, capture, details, key)
}

pub fn app(state: AppState) -> Router {
    lens_identify::build_router(state)
}
