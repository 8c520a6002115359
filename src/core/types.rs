use serde::{Deserialize, Serialize};

/// Unique identifier for a taxon in the taxonomy (an OTT id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxonId(pub u64);

impl TaxonId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TaxonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaxonId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept both bare ids and the "ott123" form used in OTT exports
        let digits = s.trim().trim_start_matches("ott");
        digits.parse::<u64>().map(Self)
    }
}

/// Nomenclatural code governing a taxon's name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NomenclaturalCode {
    /// Zoological code (animals)
    #[serde(rename = "ICZN")]
    Iczn,
    /// Botanical code (algae, fungi, plants); formerly ICBN
    #[serde(rename = "ICN", alias = "ICBN")]
    Icn,
    /// Prokaryote code (bacteria, archaea)
    #[serde(rename = "ICNP")]
    Icnp,
    /// Virus code
    #[serde(rename = "ICVCN")]
    Icvcn,
    /// No code applies, or it is not known
    #[default]
    #[serde(rename = "undefined", alias = "Undefined")]
    Undefined,
}

impl NomenclaturalCode {
    /// Parse a code from its abbreviation, case-insensitively
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "ICZN" => Self::Iczn,
            "ICN" | "ICBN" => Self::Icn,
            "ICNP" => Self::Icnp,
            "ICVCN" => Self::Icvcn,
            _ => Self::Undefined,
        }
    }
}

impl std::fmt::Display for NomenclaturalCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Iczn => write!(f, "ICZN"),
            Self::Icn => write!(f, "ICN"),
            Self::Icnp => write!(f, "ICNP"),
            Self::Icvcn => write!(f, "ICVCN"),
            Self::Undefined => write!(f, "undefined"),
        }
    }
}

/// Broad grouping used to present taxonomic contexts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContextGroup {
    Life,
    Microbes,
    Animals,
    Fungi,
    Plants,
}

impl ContextGroup {
    pub const ALL: [ContextGroup; 5] = [
        Self::Life,
        Self::Microbes,
        Self::Animals,
        Self::Fungi,
        Self::Plants,
    ];
}

impl std::fmt::Display for ContextGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Life => write!(f, "LIFE"),
            Self::Microbes => write!(f, "MICROBES"),
            Self::Animals => write!(f, "ANIMALS"),
            Self::Fungi => write!(f, "FUNGI"),
            Self::Plants => write!(f, "PLANTS"),
        }
    }
}
