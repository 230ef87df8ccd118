//! Tests for the HTTP clients against a local mock upstream
//!
//! The mock server binds an ephemeral port on 127.0.0.1, so these tests
//! never reach the real classification or tree-detail services.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use lens_common::config::{ClassifierConfig, TreeDetailConfig};
use lens_identify::services::classifier_client::{
    Classifier, ClassifierError, RoboflowClient, SharedApiKey,
};
use lens_identify::services::tree_detail_client::{
    DetailError, HttpTreeDetailClient, TreeDetailSource,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;

/// What the mock classifier saw on its last request
#[derive(Debug, Default, Clone)]
struct Captured {
    api_key: Option<String>,
    content_type: Option<String>,
    body: String,
}

type Capture = Arc<Mutex<Option<Captured>>>;

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Should bind ephemeral port");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn classifier(base_url: &str, timeout_secs: u64, key: Option<&str>) -> RoboflowClient {
    let config = ClassifierConfig {
        api_key: None,
        base_url: base_url.to_string(),
        model: "natreee/13".to_string(),
        timeout_secs,
    };
    let key: SharedApiKey = Arc::new(RwLock::new(key.map(str::to_string)));
    RoboflowClient::new(&config, key).unwrap()
}

async fn recording_model(
    State(capture): State<Capture>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    *capture.lock().unwrap() = Some(Captured {
        api_key: query.get("api_key").cloned(),
        content_type: headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
    Json(json!({
        "time": 0.04,
        "image": { "width": 640, "height": 480 },
        "predictions": [
            { "class": "narra", "confidence": 0.93, "class_id": 0 },
            { "class": "ipil", "confidence": 0.05, "class_id": 2 }
        ]
    }))
}

#[tokio::test]
async fn test_classify_sends_key_and_raw_image() {
    let capture: Capture = Arc::default();
    let base = spawn(
        Router::new()
            .route("/natreee/13", post(recording_model))
            .with_state(capture.clone()),
    )
    .await;

    let predictions = classifier(&base, 5, Some("secret"))
        .classify("aGVsbG8=")
        .await
        .unwrap();

    assert_eq!(predictions.len(), 2);
    assert_eq!(predictions[0].label, "narra");
    assert_eq!(predictions[0].confidence, 0.93);

    let seen = capture.lock().unwrap().clone().expect("Should reach mock");
    assert_eq!(seen.api_key.as_deref(), Some("secret"));
    assert_eq!(
        seen.content_type.as_deref(),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(seen.body, "aGVsbG8=");
}

#[tokio::test]
async fn test_classify_missing_predictions_is_empty() {
    let base = spawn(Router::new().route(
        "/natreee/13",
        post(|| async { Json(json!({ "time": 0.01 })) }),
    ))
    .await;

    let predictions = classifier(&base, 5, Some("k")).classify("aGVsbG8=").await.unwrap();

    assert!(predictions.is_empty());
}

#[tokio::test]
async fn test_classify_rejected_key() {
    let base = spawn(Router::new().route(
        "/natreee/13",
        post(|| async { (StatusCode::UNAUTHORIZED, "Unauthorized") }),
    ))
    .await;

    let result = classifier(&base, 5, Some("bad")).classify("aGVsbG8=").await;

    assert!(matches!(result, Err(ClassifierError::InvalidApiKey)));
}

#[tokio::test]
async fn test_classify_server_error() {
    let base = spawn(Router::new().route(
        "/natreee/13",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model crashed") }),
    ))
    .await;

    let result = classifier(&base, 5, Some("k")).classify("aGVsbG8=").await;

    match result {
        Err(ClassifierError::ApiError(status, text)) => {
            assert_eq!(status, 500);
            assert_eq!(text, "model crashed");
        }
        other => panic!("Expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_classify_malformed_body() {
    let base = spawn(Router::new().route(
        "/natreee/13",
        post(|| async { "<html>gateway</html>" }),
    ))
    .await;

    let result = classifier(&base, 5, Some("k")).classify("aGVsbG8=").await;

    assert!(matches!(result, Err(ClassifierError::ParseError(_))));
}

#[tokio::test]
async fn test_classify_times_out() {
    let base = spawn(Router::new().route(
        "/natreee/13",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(json!({ "predictions": [] }))
        }),
    ))
    .await;

    let result = classifier(&base, 1, Some("k")).classify("aGVsbG8=").await;

    assert!(matches!(result, Err(ClassifierError::Timeout(_))));
}

#[tokio::test]
async fn test_classify_unreachable_host() {
    // Bind then drop to get a port nobody listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = classifier(&format!("http://{}", addr), 5, Some("k"))
        .classify("aGVsbG8=")
        .await;

    assert!(matches!(result, Err(ClassifierError::NetworkError(_))));
}

// =============================================================================
// Tree-detail backend
// =============================================================================

async fn tree_by_id(Path(id): Path<String>) -> impl IntoResponse {
    if id == "1" {
        Json(json!({
            "tree_name": "Narra",
            "sci_name": "Pterocarpus indicus",
            "description": "National tree.",
            "location": { "latitude": 14.65, "longitude": 121.07 }
        }))
        .into_response()
    } else {
        (StatusCode::NOT_FOUND, "no such tree").into_response()
    }
}

fn detail_client(base_url: String) -> HttpTreeDetailClient {
    HttpTreeDetailClient::new(&TreeDetailConfig {
        base_url,
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_tree_detail_fetch() {
    let base = spawn(Router::new().route("/api/trees/:id", get(tree_by_id))).await;
    let client = detail_client(format!("{}/api/", base));

    let record = client.fetch("1").await.unwrap();

    assert_eq!(record.tree_name.as_deref(), Some("Narra"));
    assert_eq!(record.growth_needs, None);
    let location = record.location.unwrap();
    assert_eq!(location.latitude, 14.65);
    assert_eq!(location.label, None);
}

#[tokio::test]
async fn test_tree_detail_not_found() {
    let base = spawn(Router::new().route("/api/trees/:id", get(tree_by_id))).await;
    let client = detail_client(format!("{}/api", base));

    let result = client.fetch("9").await;

    assert!(matches!(result, Err(DetailError::NotFound(id)) if id == "9"));
}
