use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;

use crate::core::context::TaxonomyContext;
use crate::core::taxon::Taxon;
use crate::core::types::{NomenclaturalCode, TaxonId};
use crate::matching::scoring::PERFECT_SCORE;

/// One candidate match for a search string
#[derive(Debug, Clone, Serialize)]
pub struct TnrsHit {
    /// The matched taxon
    pub taxon: Arc<Taxon>,

    /// The string that was searched for
    pub search_string: String,

    /// Exact, unambiguous match
    pub is_perfect_match: bool,

    /// Found by similarity search rather than exact lookup
    pub is_approximate: bool,

    /// One of several taxa sharing the searched name
    pub is_homonym: bool,

    /// The searched name is a synonym of the taxon rather than its canonical name
    pub is_synonym: bool,

    /// Code governing the matched name; `None` when the nomenclatural status
    /// is unknown
    pub nomenclature_code: Option<NomenclaturalCode>,

    /// Name of the taxonomy the match came from
    pub source: String,

    pub score: f64,
}

impl TnrsHit {
    /// Hit from an exact lookup; perfect unless it is one of several homonyms
    pub fn exact(taxon: Arc<Taxon>, search_string: &str, source: &str, is_homonym: bool) -> Self {
        let is_synonym = !taxon.is_named(search_string) && taxon.has_synonym(search_string);
        Self {
            nomenclature_code: Some(taxon.code),
            taxon,
            search_string: search_string.to_string(),
            is_perfect_match: !is_homonym,
            is_approximate: false,
            is_homonym,
            is_synonym,
            source: source.to_string(),
            score: PERFECT_SCORE,
        }
    }

    /// Hit from a similarity search; nomenclatural status is not carried over
    pub fn approximate(taxon: Arc<Taxon>, search_string: &str, source: &str, score: f64) -> Self {
        Self {
            taxon,
            search_string: search_string.to_string(),
            is_perfect_match: false,
            is_approximate: true,
            is_homonym: false,
            is_synonym: false,
            nomenclature_code: None,
            source: source.to_string(),
            score: score.clamp(0.0, 1.0),
        }
    }

    pub fn taxon_id(&self) -> TaxonId {
        self.taxon.id
    }
}

/// Hits for one search string, in discovery order
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct TnrsMatchSet {
    hits: Vec<TnrsHit>,
}

impl TnrsMatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, hit: TnrsHit) {
        self.hits.push(hit);
    }

    pub fn iter(&self) -> impl Iterator<Item = &TnrsHit> {
        self.hits.iter()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn has_perfect_match(&self) -> bool {
        self.hits.iter().any(|h| h.is_perfect_match)
    }
}

impl FromIterator<TnrsHit> for TnrsMatchSet {
    fn from_iter<T: IntoIterator<Item = TnrsHit>>(iter: T) -> Self {
        Self {
            hits: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for TnrsMatchSet {
    type Item = TnrsHit;
    type IntoIter = std::vec::IntoIter<TnrsHit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.into_iter()
    }
}

/// All hits recorded for one search string
#[derive(Debug, Clone, Serialize)]
pub struct TnrsNameResult {
    pub name: String,
    pub matches: TnrsMatchSet,
}

impl TnrsNameResult {
    pub fn is_matched(&self) -> bool {
        !self.matches.is_empty()
    }
}

/// Outcome of resolving a batch of names.
///
/// Every name ends up in exactly one of three sets: names with a direct
/// (exact or homonym) match, names with approximate matches only, and
/// unmatched names. Hits are only ever added to names that have none yet, so
/// earlier stages are never overridden or reordered.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TnrsResults {
    results: Vec<TnrsNameResult>,

    #[serde(skip)]
    positions: HashMap<String, usize>,

    names_with_direct_matches: BTreeSet<String>,
    names_with_approximate_matches: BTreeSet<String>,
    unmatched_names: BTreeSet<String>,

    /// Context the names were matched in
    context: Option<TaxonomyContext>,

    /// Least inclusive common ancestor used to weight approximate matches
    lica: Option<TaxonId>,

    includes_approximate_matches: bool,
}

impl TnrsResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record hits from an exact lookup. Ignored if empty or if `name`
    /// already has hits.
    pub fn record_exact(&mut self, name: &str, matches: TnrsMatchSet) {
        if matches.is_empty() || self.has_matches(name) {
            return;
        }
        self.insert(name, matches);
        self.names_with_direct_matches.insert(name.to_string());
    }

    /// Record hits from a similarity search. Ignored if empty or if `name`
    /// already has hits.
    pub fn record_approximate(&mut self, name: &str, matches: TnrsMatchSet) {
        if matches.is_empty() || self.has_matches(name) {
            return;
        }
        self.insert(name, matches);
        self.names_with_approximate_matches.insert(name.to_string());
    }

    /// Record that every matching stage was attempted for `name` without
    /// success. Ignored if `name` has hits.
    pub fn mark_unmatched(&mut self, name: &str) {
        if !self.has_matches(name) {
            self.unmatched_names.insert(name.to_string());
        }
    }

    fn insert(&mut self, name: &str, matches: TnrsMatchSet) {
        self.unmatched_names.remove(name);
        self.positions.insert(name.to_string(), self.results.len());
        self.results.push(TnrsNameResult {
            name: name.to_string(),
            matches,
        });
    }

    pub fn has_matches(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// A name is finalized once it has a perfect match; later stages skip it
    pub fn is_finalized(&self, name: &str) -> bool {
        self.get(name)
            .is_some_and(|result| result.matches.has_perfect_match())
    }

    pub fn get(&self, name: &str) -> Option<&TnrsNameResult> {
        self.positions.get(name).map(|&i| &self.results[i])
    }

    /// Matched names in the order they were resolved
    pub fn iter(&self) -> impl Iterator<Item = &TnrsNameResult> {
        self.results.iter()
    }

    /// Number of names with at least one hit
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn names_with_direct_matches(&self) -> &BTreeSet<String> {
        &self.names_with_direct_matches
    }

    pub fn names_with_approximate_matches(&self) -> &BTreeSet<String> {
        &self.names_with_approximate_matches
    }

    pub fn unmatched_names(&self) -> &BTreeSet<String> {
        &self.unmatched_names
    }

    pub fn context(&self) -> Option<&TaxonomyContext> {
        self.context.as_ref()
    }

    pub fn set_context(&mut self, context: TaxonomyContext) {
        self.context = Some(context);
    }

    pub fn lica(&self) -> Option<TaxonId> {
        self.lica
    }

    pub fn set_lica(&mut self, lica: TaxonId) {
        self.lica = Some(lica);
    }

    pub fn includes_approximate_matches(&self) -> bool {
        self.includes_approximate_matches
    }

    pub fn set_includes_approximate_matches(&mut self, attempted: bool) {
        self.includes_approximate_matches = attempted;
    }
}
