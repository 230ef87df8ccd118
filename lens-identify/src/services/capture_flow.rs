//! Capture/upload identification flow
//!
//! image → classifier → resolver → history ledger → outcome
//!
//! The outcome carries everything the next view needs (species id and
//! detail path), so no state is left behind between requests.
//!
//! Failure kinds stay distinct:
//! - classifier unreachable or malformed answer → `CaptureError::Classification`
//! - classifier answered but nothing matched → `IdentifyOutcome::NotIdentified`
//! - history write failed → logged, identification still succeeds

use base64::Engine;
use lens_common::HistoryEntry;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::services::classifier_client::{Classifier, ClassifierError};
use crate::services::history_ledger::HistoryLedger;
use crate::services::request_lifecycle::{
    FinishOutcome, RequestState, RequestTicket, RequestTracker,
};
use crate::services::resolver::{resolve, Prediction, Resolution, ResolvedSpecies};

pub const NOT_IDENTIFIED_MESSAGE: &str =
    "Could not identify the tree. Please try a clearer image or a known tree.";
pub const CLASSIFICATION_FAILED_MESSAGE: &str = "Failed to send image to AI model.";

/// Capture flow errors
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Classification failed: {0}")]
    Classification(#[from] ClassifierError),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Request superseded by a newer request")]
    Superseded,
}

/// What the capture view shows after a request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IdentifyOutcome {
    Identified {
        tree_id: String,
        name: String,
        scientific_name: String,
        confidence: f64,
        /// Path of the detail view for this species
        detail_path: String,
    },
    /// Informational, not an error
    NotIdentified { message: String },
}

impl IdentifyOutcome {
    fn identified(resolved: &ResolvedSpecies) -> Self {
        IdentifyOutcome::Identified {
            tree_id: resolved.id.clone(),
            name: resolved.common_name.clone(),
            scientific_name: resolved.scientific_name.clone(),
            confidence: resolved.confidence,
            detail_path: format!("/api/trees/{}", resolved.id),
        }
    }

    fn not_identified() -> Self {
        IdentifyOutcome::NotIdentified {
            message: NOT_IDENTIFIED_MESSAGE.to_string(),
        }
    }
}

/// Identification flow shared by capture and upload
pub struct CaptureFlow {
    classifier: Arc<dyn Classifier>,
    ledger: Arc<HistoryLedger>,
    tracker: RequestTracker<IdentifyOutcome>,
    max_image_bytes: usize,
}

impl CaptureFlow {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        ledger: Arc<HistoryLedger>,
        max_image_bytes: usize,
    ) -> Self {
        Self {
            classifier,
            ledger,
            tracker: RequestTracker::new(),
            max_image_bytes,
        }
    }

    pub fn tracker(&self) -> &RequestTracker<IdentifyOutcome> {
        &self.tracker
    }

    /// Identify one image
    pub async fn identify(&self, image: &str) -> Result<IdentifyOutcome, CaptureError> {
        let predictions = self.classify(image).await?;
        let resolution = resolve(&predictions);
        let outcome = outcome_for(&resolution);
        self.record_history(&resolution).await;
        Ok(outcome)
    }

    /// Identify one image as the newest request of `session`
    ///
    /// A newer request for the same session, or an explicit cancel, ends
    /// this one early. The result is stored in the tracker before history
    /// is touched: a request whose result the tracker discards reports
    /// `Superseded` or `Cancelled` and never reaches history.
    pub async fn identify_tracked(
        &self,
        session: &str,
        image: &str,
    ) -> Result<IdentifyOutcome, CaptureError> {
        let ticket = self.tracker.begin(session).await;

        let classified = tokio::select! {
            biased;
            _ = ticket.token().cancelled() => None,
            result = self.classify(image) => Some(result),
        };

        let predictions = match classified {
            None => return Err(self.interruption(&ticket).await),
            Some(Err(e)) => {
                let failed = RequestState::Failed {
                    message: user_message(&e).to_string(),
                };
                return match self.tracker.finish(&ticket, failed).await {
                    FinishOutcome::Recorded => Err(e),
                    FinishOutcome::Discarded => Err(self.interruption(&ticket).await),
                };
            }
            Some(Ok(predictions)) => predictions,
        };

        let resolution = resolve(&predictions);
        let outcome = outcome_for(&resolution);
        let resolved = RequestState::Resolved {
            result: outcome.clone(),
        };

        match self.tracker.finish(&ticket, resolved).await {
            FinishOutcome::Recorded => {
                self.record_history(&resolution).await;
                Ok(outcome)
            }
            FinishOutcome::Discarded => Err(self.interruption(&ticket).await),
        }
    }

    async fn classify(&self, image: &str) -> Result<Vec<Prediction>, CaptureError> {
        let payload = prepare_image(image, self.max_image_bytes)?;

        self.classifier.classify(payload).await.map_err(|e| {
            error!(error = %e, "Failed to send image to classifier");
            CaptureError::Classification(e)
        })
    }

    /// History failures never block a successful identification
    async fn record_history(&self, resolution: &Resolution) {
        let Resolution::Identified(resolved) = resolution else {
            return;
        };
        let entry = HistoryEntry::for_species(resolved.species);
        if let Err(e) = self.ledger.append(entry).await {
            warn!(tree_id = %resolved.id, error = %e, "Failed to add tree to history");
        }
    }

    async fn interruption(&self, ticket: &RequestTicket) -> CaptureError {
        match self.tracker.state(ticket.session()).await {
            Some(RequestState::Cancelled) => CaptureError::Cancelled,
            _ => CaptureError::Superseded,
        }
    }
}

fn outcome_for(resolution: &Resolution) -> IdentifyOutcome {
    match resolution {
        Resolution::Identified(resolved) => {
            info!(
                tree_id = %resolved.id,
                confidence = resolved.confidence,
                "Tree identified"
            );
            IdentifyOutcome::identified(resolved)
        }
        Resolution::NotFound => {
            info!("Tree not identified");
            IdentifyOutcome::not_identified()
        }
    }
}

/// Message shown to the user for a capture error
pub fn user_message(error: &CaptureError) -> &'static str {
    match error {
        CaptureError::InvalidImage(_) => "Failed to process image.",
        CaptureError::Classification(_) => CLASSIFICATION_FAILED_MESSAGE,
        CaptureError::Cancelled => "Request cancelled.",
        CaptureError::Superseded => "Request superseded by a newer request.",
    }
}

/// Validate an image payload and return the base64 text to send
///
/// Accepts bare base64 or a `data:image/...;base64,` URL.
pub fn prepare_image(image: &str, max_bytes: usize) -> Result<&str, CaptureError> {
    let trimmed = image.trim();
    let payload = match trimmed.strip_prefix("data:") {
        Some(rest) => match rest.split_once(";base64,") {
            Some((_, data)) => data,
            None => {
                return Err(CaptureError::InvalidImage(
                    "data URL is not base64-encoded".to_string(),
                ))
            }
        },
        None => trimmed,
    };

    if payload.is_empty() {
        return Err(CaptureError::InvalidImage("image payload is empty".to_string()));
    }

    // Reject before decoding when the encoded length already exceeds the limit
    let estimated = payload.len() / 4 * 3;
    if estimated > max_bytes.saturating_add(3) {
        return Err(too_large(estimated, max_bytes));
    }

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| CaptureError::InvalidImage(format!("image payload is not valid base64: {}", e)))?;

    if decoded.len() > max_bytes {
        return Err(too_large(decoded.len(), max_bytes));
    }

    Ok(payload)
}

fn too_large(size: usize, max_bytes: usize) -> CaptureError {
    CaptureError::InvalidImage(format!(
        "image is {} bytes, limit is {} bytes",
        size, max_bytes
    ))
}
