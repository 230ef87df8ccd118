//! Species catalog
//!
//! The fixed table of native tree species the classifier is trained on.
//! Every supported species has exactly one entry; the table never changes
//! at runtime.
//!
//! | id | label    | scientific name          |
//! |----|----------|--------------------------|
//! | 1  | narra    | Pterocarpus indicus      |
//! | 2  | banaba   | Lagerstroemia speciosa   |
//! | 3  | ipil     | Intsia bijuga            |
//! | 4  | kamagong | Diospyros philippinensis |
//! | 5  | talisay  | Terminalia catappa       |

use serde::{Deserialize, Serialize};

/// Classifier label that is recognised but never resolves to a species
pub const UNKNOWN_LABEL: &str = "unknown";

/// Supported native tree species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Narra,
    Banaba,
    Ipil,
    Kamagong,
    Talisay,
}

impl Species {
    /// All species in catalog (id) order
    pub const ALL: [Species; 5] = [
        Species::Narra,
        Species::Banaba,
        Species::Ipil,
        Species::Kamagong,
        Species::Talisay,
    ];

    /// Stable short identifier, used in detail paths and history entries
    pub fn id(self) -> &'static str {
        match self {
            Species::Narra => "1",
            Species::Banaba => "2",
            Species::Ipil => "3",
            Species::Kamagong => "4",
            Species::Talisay => "5",
        }
    }

    /// Lowercase canonical name, identical to the classifier label
    pub fn common_name(self) -> &'static str {
        match self {
            Species::Narra => "narra",
            Species::Banaba => "banaba",
            Species::Ipil => "ipil",
            Species::Kamagong => "kamagong",
            Species::Talisay => "talisay",
        }
    }

    /// Binomial name
    pub fn scientific_name(self) -> &'static str {
        match self {
            Species::Narra => "Pterocarpus indicus",
            Species::Banaba => "Lagerstroemia speciosa",
            Species::Ipil => "Intsia bijuga",
            Species::Kamagong => "Diospyros philippinensis",
            Species::Talisay => "Terminalia catappa",
        }
    }

    /// Title-cased common name ("Narra")
    pub fn display_name(self) -> String {
        title_case(self.common_name())
    }

    /// Look up a species by its identifier (exact match)
    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim() {
            "1" => Some(Species::Narra),
            "2" => Some(Species::Banaba),
            "3" => Some(Species::Ipil),
            "4" => Some(Species::Kamagong),
            "5" => Some(Species::Talisay),
            _ => None,
        }
    }

    /// Look up a species by common name, ignoring case and surrounding whitespace
    pub fn from_label(label: &str) -> Option<Self> {
        match SpeciesLabel::parse(label)? {
            SpeciesLabel::Known(species) => Some(species),
            SpeciesLabel::Unrecognized => None,
        }
    }
}

impl std::fmt::Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.common_name())
    }
}

/// A classifier label that belongs to the known label set
///
/// The known set is the five species plus the `unknown` sentinel. Labels
/// outside that set do not parse at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeciesLabel {
    /// Label of a real species
    Known(Species),
    /// The `unknown` sentinel class
    Unrecognized,
}

impl SpeciesLabel {
    /// Parse a free-text classifier label (case-insensitive)
    pub fn parse(label: &str) -> Option<Self> {
        let folded = label.trim().to_lowercase();
        let parsed = match folded.as_str() {
            "narra" => SpeciesLabel::Known(Species::Narra),
            "banaba" => SpeciesLabel::Known(Species::Banaba),
            "ipil" => SpeciesLabel::Known(Species::Ipil),
            "kamagong" => SpeciesLabel::Known(Species::Kamagong),
            "talisay" => SpeciesLabel::Known(Species::Talisay),
            UNKNOWN_LABEL => SpeciesLabel::Unrecognized,
            _ => return None,
        };
        Some(parsed)
    }

    /// The species this label resolves to, if any
    pub fn species(self) -> Option<Species> {
        match self {
            SpeciesLabel::Known(species) => Some(species),
            SpeciesLabel::Unrecognized => None,
        }
    }
}

/// Search the catalog by common or scientific name
///
/// Case-insensitive substring match, results in catalog order. An empty
/// query returns every species.
pub fn search(query: &str) -> Vec<Species> {
    let needle = query.trim().to_lowercase();
    Species::ALL
        .iter()
        .copied()
        .filter(|species| {
            needle.is_empty()
                || species.common_name().contains(&needle)
                || species.scientific_name().to_lowercase().contains(&needle)
        })
        .collect()
}

/// Uppercase the first character, leave the rest untouched
pub fn title_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
