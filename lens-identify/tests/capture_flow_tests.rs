//! Integration tests for the capture/upload identification flow
//!
//! Covers:
//! - successful identification writes history and carries the detail path
//! - "not identified" and classifier failures stay distinct
//! - history write failures don't block identification
//! - superseded and cancelled tracked requests
//! - the tracker decides a tracked result before history is written

mod helpers;

use async_trait::async_trait;
use helpers::{capture_flow, narra, test_pool, ScriptedClassifier, IMAGE};
use lens_common::{DuplicatePolicy, HistoryEntry, Species};
use lens_identify::services::capture_flow::NOT_IDENTIFIED_MESSAGE;
use lens_identify::services::resolver::Prediction;
use lens_identify::services::{
    CaptureError, CaptureFlow, Classifier, ClassifierError, HistoryLedger, IdentifyOutcome,
    RequestState,
};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

async fn ledger() -> Arc<HistoryLedger> {
    Arc::new(HistoryLedger::new(test_pool().await, DuplicatePolicy::KeepPosition))
}

#[tokio::test]
async fn test_identified_tree_is_added_to_history() {
    let ledger = ledger().await;
    let flow = capture_flow(
        Arc::new(ScriptedClassifier::answering(vec![narra(0.95)])),
        ledger.clone(),
    );

    let outcome = flow.identify(IMAGE).await.unwrap();

    assert_eq!(
        outcome,
        IdentifyOutcome::Identified {
            tree_id: "1".to_string(),
            name: "Narra".to_string(),
            scientific_name: "Pterocarpus indicus".to_string(),
            confidence: 0.95,
            detail_path: "/api/trees/1".to_string(),
        }
    );
    assert_eq!(
        ledger.read_all().await.unwrap(),
        vec![HistoryEntry::for_species(Species::Narra)]
    );
}

#[tokio::test]
async fn test_low_confidence_is_not_identified() {
    let ledger = ledger().await;
    let flow = capture_flow(
        Arc::new(ScriptedClassifier::answering(vec![
            Prediction::new("banaba", 0.5),
            Prediction::new("unknown", 0.99),
        ])),
        ledger.clone(),
    );

    let outcome = flow.identify(IMAGE).await.unwrap();

    assert_eq!(
        outcome,
        IdentifyOutcome::NotIdentified {
            message: NOT_IDENTIFIED_MESSAGE.to_string()
        }
    );
    assert!(ledger.read_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_classifier_failure_is_an_error_not_a_miss() {
    let ledger = ledger().await;
    let flow = capture_flow(Arc::new(ScriptedClassifier::failing()), ledger.clone());

    let result = flow.identify(IMAGE).await;

    assert!(matches!(
        result,
        Err(CaptureError::Classification(ClassifierError::NetworkError(_)))
    ));
    assert!(ledger.read_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_image_never_reaches_classifier() {
    let classifier = Arc::new(ScriptedClassifier::answering(vec![narra(0.95)]));
    let flow = capture_flow(classifier.clone(), ledger().await);

    let result = flow.identify("%%%").await;

    assert!(matches!(result, Err(CaptureError::InvalidImage(_))));
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn test_history_failure_does_not_block_identification() {
    let pool = test_pool().await;
    let ledger = Arc::new(HistoryLedger::new(pool.clone(), DuplicatePolicy::KeepPosition));
    let flow = capture_flow(
        Arc::new(ScriptedClassifier::answering(vec![narra(0.97)])),
        ledger,
    );
    pool.close().await;

    let outcome = flow.identify(IMAGE).await.unwrap();

    assert!(matches!(outcome, IdentifyOutcome::Identified { .. }));
}

#[tokio::test]
async fn test_tracked_request_records_resolved_state() {
    let flow = capture_flow(
        Arc::new(ScriptedClassifier::answering(vec![narra(0.95)])),
        ledger().await,
    );

    let outcome = flow.identify_tracked("phone", IMAGE).await.unwrap();

    assert_eq!(
        flow.tracker().state("phone").await,
        Some(RequestState::Resolved { result: outcome })
    );
}

#[tokio::test]
async fn test_tracked_failure_records_failed_state() {
    let flow = capture_flow(Arc::new(ScriptedClassifier::failing()), ledger().await);

    let result = flow.identify_tracked("phone", IMAGE).await;

    assert!(result.is_err());
    assert_eq!(
        flow.tracker().state("phone").await,
        Some(RequestState::Failed {
            message: "Failed to send image to AI model.".to_string()
        })
    );
}

#[tokio::test]
async fn test_newer_request_supersedes_slow_one() {
    let ledger = ledger().await;
    let flow = capture_flow(
        Arc::new(
            ScriptedClassifier::answering(vec![narra(0.95)]).with_delay(Duration::from_millis(200)),
        ),
        ledger.clone(),
    );

    let first = {
        let flow = flow.clone();
        tokio::spawn(async move { flow.identify_tracked("phone", IMAGE).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = flow.identify_tracked("phone", IMAGE).await;

    assert!(matches!(first.await.unwrap(), Err(CaptureError::Superseded)));
    assert!(second.is_ok());
    // Only the surviving request wrote history
    assert_eq!(ledger.read_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancelled_request_leaves_history_untouched() {
    let ledger = ledger().await;
    let flow = capture_flow(
        Arc::new(
            ScriptedClassifier::answering(vec![narra(0.95)]).with_delay(Duration::from_millis(500)),
        ),
        ledger.clone(),
    );

    let pending = {
        let flow = flow.clone();
        tokio::spawn(async move { flow.identify_tracked("phone", IMAGE).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(flow.tracker().cancel("phone").await);

    assert!(matches!(pending.await.unwrap(), Err(CaptureError::Cancelled)));
    assert_eq!(flow.tracker().state("phone").await, Some(RequestState::Cancelled));
    assert!(ledger.read_all().await.unwrap().is_empty());
}

/// Classifier whose answer lands together with a newer request of the
/// same session, after the cancellation check already passed
struct AnswerRacesNewRequest {
    flow: OnceLock<Weak<CaptureFlow>>,
}

#[async_trait]
impl Classifier for AnswerRacesNewRequest {
    async fn classify(&self, _image_base64: &str) -> Result<Vec<Prediction>, ClassifierError> {
        if let Some(flow) = self.flow.get().and_then(Weak::upgrade) {
            flow.tracker().begin("phone").await;
        }
        Ok(vec![narra(0.95)])
    }
}

#[tokio::test]
async fn test_superseded_answer_never_reaches_history() {
    let ledger = ledger().await;
    let classifier = Arc::new(AnswerRacesNewRequest {
        flow: OnceLock::new(),
    });
    let flow = capture_flow(classifier.clone(), ledger.clone());
    classifier.flow.set(Arc::downgrade(&flow)).ok();

    let result = flow.identify_tracked("phone", IMAGE).await;

    assert!(matches!(result, Err(CaptureError::Superseded)));
    assert!(ledger.read_all().await.unwrap().is_empty());
    // The newer request still owns the session
    assert_eq!(flow.tracker().state("phone").await, Some(RequestState::Pending));
}

#[tokio::test]
async fn test_result_is_settled_before_history_write() {
    let pool = test_pool().await;
    let ledger = Arc::new(HistoryLedger::new(pool.clone(), DuplicatePolicy::KeepPosition));
    let flow = capture_flow(
        Arc::new(ScriptedClassifier::answering(vec![narra(0.95)])),
        ledger.clone(),
    );

    // Hold the only connection so the history write stalls
    let conn = pool.acquire().await.unwrap();
    let first = {
        let flow = flow.clone();
        tokio::spawn(async move { flow.identify_tracked("phone", IMAGE).await })
    };

    // The tracker reports the result while history is still blocked
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if let Some(RequestState::Resolved { .. }) = flow.tracker().state("phone").await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Result should be recorded before the history write finishes");

    // A newer request now finds nothing pending to supersede
    let newer = flow.tracker().begin("phone").await;
    assert!(!newer.token().is_cancelled());

    drop(conn);
    let outcome = first.await.unwrap().unwrap();

    assert!(matches!(outcome, IdentifyOutcome::Identified { .. }));
    assert_eq!(
        ledger.read_all().await.unwrap(),
        vec![HistoryEntry::for_species(Species::Narra)]
    );
}
