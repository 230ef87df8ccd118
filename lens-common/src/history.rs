//! History data model
//!
//! Records persisted by the history ledger. Names are copied at write time so
//! stored history stays readable even if the species catalog changes later.

use serde::{Deserialize, Serialize};

use crate::species::Species;

/// One previously identified species
///
/// Serialized with the field names the mobile client stores
/// (`treeId`, `tree_name`, `sci_name`) so existing payloads stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Foreign reference to `Species::id`
    #[serde(rename = "treeId")]
    pub species_id: String,

    /// Lowercase common name at write time
    #[serde(rename = "tree_name")]
    pub common_name: String,

    /// Scientific name at write time
    #[serde(rename = "sci_name")]
    pub scientific_name: String,
}

impl HistoryEntry {
    pub fn new(
        species_id: impl Into<String>,
        common_name: impl Into<String>,
        scientific_name: impl Into<String>,
    ) -> Self {
        Self {
            species_id: species_id.into(),
            common_name: common_name.into(),
            scientific_name: scientific_name.into(),
        }
    }

    /// Entry for a catalog species
    pub fn for_species(species: Species) -> Self {
        Self::new(species.id(), species.common_name(), species.scientific_name())
    }
}

/// What appending an already-present species does to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// No-op: the existing entry keeps its position
    #[default]
    KeepPosition,
    /// The existing entry is replaced by the new one at the front
    MoveToFront,
}
