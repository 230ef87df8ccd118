//! Tree-detail backend client
//!
//! Fetches botanical details for a species and assembles the sections shown
//! on the tree information view. Missing optional fields degrade to
//! placeholder text; each section is fetched and fails on its own.

use async_trait::async_trait;
use lens_common::config::TreeDetailConfig;
use lens_common::Species;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const NO_DESCRIPTION: &str = "No description available";
pub const NO_GROWTH_NEEDS: &str = "No specific growth needs listed.";
pub const NO_GROWTH_PERIOD: &str = "No growth period data available.";
pub const NO_LIFESPAN: &str = "No lifespan data available.";
pub const NO_LOCATION: &str = "No location data available.";

pub const OVERVIEW_FAILED: &str = "Failed to fetch tree data. Please try again later.";
pub const GROWTH_NEEDS_FAILED: &str = "Failed to fetch growth needs.";
pub const SECTION_FAILED: &str = "Failed to load data.";

/// Tree-detail client errors
#[derive(Debug, Error)]
pub enum DetailError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Tree not found: {0}")]
    NotFound(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Record returned by the tree-detail backend; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TreeRecord {
    #[serde(default)]
    pub tree_name: Option<String>,
    #[serde(default)]
    pub sci_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub growth_needs: Option<String>,
    #[serde(default)]
    pub growth_period: Option<String>,
    #[serde(default)]
    pub lifespan: Option<String>,
    #[serde(default)]
    pub location: Option<TreeLocation>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TreeLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub label: Option<String>,
}

/// Source of tree details
#[async_trait]
pub trait TreeDetailSource: Send + Sync {
    async fn fetch(&self, tree_id: &str) -> Result<TreeRecord, DetailError>;
}

/// HTTP client for the tree-detail backend (`GET {base_url}/trees/{id}`)
pub struct HttpTreeDetailClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpTreeDetailClient {
    pub fn new(config: &TreeDetailConfig) -> Result<Self, DetailError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| DetailError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TreeDetailSource for HttpTreeDetailClient {
    async fn fetch(&self, tree_id: &str) -> Result<TreeRecord, DetailError> {
        let url = format!("{}/trees/{}", self.base_url, tree_id);
        tracing::debug!(%url, "Fetching tree details");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| DetailError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(DetailError::NotFound(tree_id.to_string()));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(DetailError::ApiError(status.as_u16(), error_text));
        }

        response
            .json::<TreeRecord>()
            .await
            .map_err(|e| DetailError::ParseError(e.to_string()))
    }
}

/// Header block of the tree information view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeOverview {
    pub id: String,
    pub name: String,
    pub scientific_name: String,
    pub description: String,
}

impl TreeOverview {
    /// Names fall back to the catalog entry when the backend omits them
    pub fn from_record(species: Species, record: &TreeRecord) -> Self {
        Self {
            id: species.id().to_string(),
            name: non_blank(&record.tree_name).unwrap_or_else(|| species.display_name()),
            scientific_name: non_blank(&record.sci_name)
                .unwrap_or_else(|| species.scientific_name().to_string()),
            description: non_blank(&record.description)
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        }
    }
}

/// Free-text sections loaded independently of each other
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSection {
    GrowthNeeds,
    GrowthPeriod,
    Lifespan,
}

impl TextSection {
    pub fn as_str(self) -> &'static str {
        match self {
            TextSection::GrowthNeeds => "growth_needs",
            TextSection::GrowthPeriod => "growth_period",
            TextSection::Lifespan => "lifespan",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            TextSection::GrowthNeeds => NO_GROWTH_NEEDS,
            TextSection::GrowthPeriod => NO_GROWTH_PERIOD,
            TextSection::Lifespan => NO_LIFESPAN,
        }
    }

    /// Message shown when the section's fetch fails
    pub fn failure_message(self) -> &'static str {
        match self {
            TextSection::GrowthNeeds => GROWTH_NEEDS_FAILED,
            TextSection::GrowthPeriod | TextSection::Lifespan => SECTION_FAILED,
        }
    }

    fn field(self, record: &TreeRecord) -> &Option<String> {
        match self {
            TextSection::GrowthNeeds => &record.growth_needs,
            TextSection::GrowthPeriod => &record.growth_period,
            TextSection::Lifespan => &record.lifespan,
        }
    }

    pub fn render(self, tree_id: &str, record: &TreeRecord) -> SectionView {
        match non_blank(self.field(record)) {
            Some(text) => SectionView {
                id: tree_id.to_string(),
                section: self.as_str(),
                text,
                available: true,
            },
            None => SectionView {
                id: tree_id.to_string(),
                section: self.as_str(),
                text: self.placeholder().to_string(),
                available: false,
            },
        }
    }
}

/// One rendered text section
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionView {
    pub id: String,
    pub section: &'static str,
    pub text: String,
    /// false when `text` is a placeholder
    pub available: bool,
}

/// Map section of the tree information view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationView {
    pub id: String,
    pub location: Option<TreeLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

impl LocationView {
    pub fn from_record(tree_id: &str, record: &TreeRecord) -> Self {
        let location = record.location.clone();
        let note = if location.is_none() { Some(NO_LOCATION) } else { None };
        Self {
            id: tree_id.to_string(),
            location,
            note,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
