//! Identification services
//!
//! - `classifier_client`: remote image classification (Roboflow)
//! - `resolver`: maps raw predictions onto the species catalog
//! - `history_ledger`: bounded, deduplicated history of identified species
//! - `tree_detail_client`: remote botanical details with placeholder fallbacks
//! - `request_lifecycle`: pending/resolved/failed/cancelled tracking per session
//! - `capture_flow`: image → classifier → resolver → ledger

pub mod capture_flow;
pub mod classifier_client;
pub mod history_ledger;
pub mod request_lifecycle;
pub mod resolver;
pub mod tree_detail_client;

pub use capture_flow::{CaptureError, CaptureFlow, IdentifyOutcome};
pub use classifier_client::{Classifier, ClassifierError, RoboflowClient};
pub use history_ledger::{AppendOutcome, HistoryError, HistoryLedger};
pub use request_lifecycle::{FinishOutcome, RequestState, RequestTicket, RequestTracker};
pub use resolver::{resolve, Prediction, Resolution, ResolvedSpecies};
pub use tree_detail_client::{DetailError, HttpTreeDetailClient, TreeDetailSource, TreeRecord};
