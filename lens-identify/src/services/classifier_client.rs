//! Remote image classification client
//!
//! Sends a base64-encoded leaf image to the hosted classification model and
//! returns the raw prediction set. The response is treated as opaque beyond
//! the `predictions` array; any transport or schema problem is a
//! `ClassifierError`.

use async_trait::async_trait;
use lens_common::config::ClassifierConfig;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::services::resolver::Prediction;

const USER_AGENT: &str = concat!("NativeLens/", env!("CARGO_PKG_VERSION"));

/// API key shared between the client and the settings endpoint
pub type SharedApiKey = Arc<RwLock<Option<String>>>;

/// Classifier client errors
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Classifier did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Classifier API key not configured")]
    NotConfigured,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Image classifier
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify one base64-encoded image
    async fn classify(&self, image_base64: &str) -> Result<Vec<Prediction>, ClassifierError>;
}

#[derive(Debug, Deserialize)]
struct ClassifierResponse {
    #[serde(default)]
    predictions: Option<Vec<Prediction>>,
}

/// Client for the Roboflow hosted inference API
pub struct RoboflowClient {
    http_client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    api_key: SharedApiKey,
}

impl RoboflowClient {
    pub fn new(config: &ClassifierConfig, api_key: SharedApiKey) -> Result<Self, ClassifierError> {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifierError::NetworkError(e.to_string()))?;

        let endpoint = format!(
            "{}/{}",
            config.base_url.trim_end_matches('/'),
            config.model.trim_matches('/')
        );

        Ok(Self {
            http_client,
            endpoint,
            timeout,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_send_error(&self, e: reqwest::Error) -> ClassifierError {
        if e.is_timeout() {
            ClassifierError::Timeout(self.timeout)
        } else {
            ClassifierError::NetworkError(e.to_string())
        }
    }
}

#[async_trait]
impl Classifier for RoboflowClient {
    async fn classify(&self, image_base64: &str) -> Result<Vec<Prediction>, ClassifierError> {
        let api_key = self
            .api_key
            .read()
            .await
            .clone()
            .ok_or(ClassifierError::NotConfigured)?;

        tracing::debug!(
            endpoint = %self.endpoint,
            payload_bytes = image_base64.len(),
            "Sending image to classifier"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .query(&[("api_key", api_key.as_str())])
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(image_base64.to_string())
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ClassifierError::InvalidApiKey);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClassifierError::ApiError(status.as_u16(), error_text));
        }

        let body: ClassifierResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ClassifierError::Timeout(self.timeout)
            } else {
                ClassifierError::ParseError(e.to_string())
            }
        })?;

        let predictions = body.predictions.unwrap_or_default();

        tracing::info!(predictions = predictions.len(), "Classifier responded");

        Ok(predictions)
    }
}
