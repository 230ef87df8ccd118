//! Classification resolver
//!
//! Maps the raw prediction set returned by the classifier onto the species
//! catalog. Pure selection, no side effects.
//!
//! Selection policy: the FIRST prediction in input order that clears the
//! confidence threshold and carries a label from the known set wins. The
//! input is not sorted by confidence. If that first survivor is the
//! `unknown` sentinel the result is `NotFound`, even when a later
//! prediction would have resolved.

use lens_common::{Species, SpeciesLabel};
use serde::{Deserialize, Serialize};

/// Minimum confidence (inclusive) for a prediction to be considered
pub const CONFIDENCE_THRESHOLD: f64 = 0.9;

/// One item of a classifier response
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Prediction {
    /// Free-text class name, case-insensitive
    #[serde(rename = "class")]
    pub label: String,
    /// Confidence in [0, 1]
    pub confidence: f64,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    fn clears_threshold(&self) -> bool {
        self.confidence.is_finite() && self.confidence >= CONFIDENCE_THRESHOLD
    }
}

/// A prediction resolved to a catalog species
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSpecies {
    #[serde(skip)]
    pub species: Species,
    /// Species identifier, used to address the detail view
    pub id: String,
    /// Title-cased common name
    pub common_name: String,
    pub scientific_name: String,
    pub confidence: f64,
}

impl ResolvedSpecies {
    fn new(species: Species, confidence: f64) -> Self {
        Self {
            species,
            id: species.id().to_string(),
            common_name: species.display_name(),
            scientific_name: species.scientific_name().to_string(),
            confidence,
        }
    }
}

/// Result of resolving a prediction set
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Identified(ResolvedSpecies),
    /// Nothing cleared the threshold, or only the sentinel did
    NotFound,
}

/// Select the best match from a classifier prediction set
pub fn resolve(predictions: &[Prediction]) -> Resolution {
    let first_match = predictions.iter().find_map(|prediction| {
        if !prediction.clears_threshold() {
            return None;
        }
        SpeciesLabel::parse(&prediction.label).map(|label| (label, prediction.confidence))
    });

    match first_match {
        Some((SpeciesLabel::Known(species), confidence)) => {
            tracing::debug!(species = %species, confidence, "Prediction resolved");
            Resolution::Identified(ResolvedSpecies::new(species, confidence))
        }
        Some((SpeciesLabel::Unrecognized, confidence)) => {
            tracing::debug!(confidence, "First match is the unknown sentinel");
            Resolution::NotFound
        }
        None => {
            tracing::debug!(
                candidates = predictions.len(),
                "No prediction cleared the confidence threshold"
            );
            Resolution::NotFound
        }
    }
}
