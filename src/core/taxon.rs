use serde::{Deserialize, Serialize};

use crate::core::types::{NomenclaturalCode, TaxonId};

/// Rank recorded for taxa without an assigned rank
pub const NO_RANK: &str = "no rank";

fn default_rank() -> String {
    NO_RANK.to_string()
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// A single named node in the taxonomic hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxon {
    /// Taxon identifier
    pub id: TaxonId,

    /// Canonical (preferred) name
    pub name: String,

    /// Taxonomic rank, e.g. "genus" or "species"
    #[serde(default = "default_rank")]
    pub rank: String,

    /// Nomenclatural code governing the name
    #[serde(default)]
    pub code: NomenclaturalCode,

    /// Parent taxon; absent only at the taxonomy root
    #[serde(default)]
    pub parent: Option<TaxonId>,

    /// Alternate names that resolve to this taxon
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,

    /// Taxon has been removed from the current taxonomy version
    #[serde(default, skip_serializing_if = "is_false")]
    pub deprecated: bool,

    /// Taxon is flagged as dubious (suppressed from synthesis)
    #[serde(default, skip_serializing_if = "is_false")]
    pub dubious: bool,

    /// Tag of the least inclusive taxonomic context containing this taxon
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub least_context: Option<String>,
}

impl Taxon {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: TaxonId(id),
            name: name.into(),
            rank: default_rank(),
            code: NomenclaturalCode::Undefined,
            parent: None,
            synonyms: Vec::new(),
            deprecated: false,
            dubious: false,
            least_context: None,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: u64) -> Self {
        self.parent = Some(TaxonId(parent));
        self
    }

    #[must_use]
    pub fn with_rank(mut self, rank: impl Into<String>) -> Self {
        self.rank = rank.into();
        self
    }

    #[must_use]
    pub fn with_code(mut self, code: NomenclaturalCode) -> Self {
        self.code = code;
        self
    }

    #[must_use]
    pub fn with_synonyms<I, S>(mut self, synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.synonyms = synonyms.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    #[must_use]
    pub fn dubious(mut self) -> Self {
        self.dubious = true;
        self
    }

    /// True for the taxonomy root (the only taxon without a parent)
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Check whether `name` is one of this taxon's synonyms (case-insensitive)
    pub fn has_synonym(&self, name: &str) -> bool {
        self.synonyms.iter().any(|s| s.eq_ignore_ascii_case(name))
    }

    /// Check whether `name` is this taxon's canonical name (case-insensitive)
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}
