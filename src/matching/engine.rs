use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::context::{ContextRegistry, TaxonomyContext};
use crate::core::taxon::Taxon;
use crate::core::types::TaxonId;
use crate::matching::context_inference::{infer_context, ContextInference};
use crate::matching::mrca::TaxonSet;
use crate::matching::results::{TnrsHit, TnrsMatchSet, TnrsResults};
use crate::matching::scoring::{min_identity_for, FuzzyScore, DEFAULT_MIN_SCORE};
use crate::taxonomy::graph::{StoreError, TaxonGraphView};
use crate::taxonomy::index::NameIndex;

/// Errors from name resolution.
///
/// "No match" is never an error; these mean the request could not be answered.
#[derive(Error, Debug)]
pub enum TnrsError {
    #[error("Backing store failure: {0}")]
    BackingStore(#[from] StoreError),

    #[error("Unknown context: {0}")]
    UnknownContext(String),
}

/// Default cap on the candidates a single fuzzy lookup may return
pub const DEFAULT_MAX_FUZZY_CANDIDATES: usize = 50;

/// Configuration for the matching engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum score for approximate matches to be kept
    pub min_score: f64,
    /// Try approximate matching for names without exact hits
    pub do_approximate_matching: bool,
    /// Return taxa flagged as dubious
    pub include_dubious: bool,
    /// Maximum candidates taken from each fuzzy lookup
    pub max_fuzzy_candidates: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            do_approximate_matching: true,
            include_dubious: true,
            max_fuzzy_candidates: DEFAULT_MAX_FUZZY_CANDIDATES,
        }
    }
}

/// Common ancestor of a list of taxon ids
#[derive(Debug, Clone, Serialize)]
pub struct LicaResult {
    /// `None` when none of the ids are known
    pub lica: Option<Arc<Taxon>>,
    /// Ids that took part in the computation
    pub ids_used: Vec<TaxonId>,
    /// Ids not present in the taxonomy
    pub ids_not_found: Vec<TaxonId>,
}

/// The main name-resolution engine.
///
/// Borrows the taxonomy collaborators read-only, so one set of collaborators
/// can serve any number of engines on different threads.
pub struct MatchingEngine<'a, G: ?Sized, I: ?Sized> {
    graph: &'a G,
    index: &'a I,
    contexts: &'a ContextRegistry,
    config: MatchingConfig,
    source: String,
}

impl<'a, G, I> MatchingEngine<'a, G, I>
where
    G: TaxonGraphView + ?Sized,
    I: NameIndex + ?Sized,
{
    /// Create a new matching engine with default configuration
    pub fn new(graph: &'a G, index: &'a I, contexts: &'a ContextRegistry) -> Self {
        Self::with_config(graph, index, contexts, MatchingConfig::default())
    }

    /// Create a new matching engine with custom configuration
    pub fn with_config(
        graph: &'a G,
        index: &'a I,
        contexts: &'a ContextRegistry,
        config: MatchingConfig,
    ) -> Self {
        Self {
            graph,
            index,
            contexts,
            config,
            source: graph.source_name().to_string(),
        }
    }

    /// Override the source label attached to hits; defaults to the graph's
    /// [`TaxonGraphView::source_name`]
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Look up a context by tag or label
    ///
    /// # Errors
    ///
    /// Returns [`TnrsError::UnknownContext`] if no such context is available.
    pub fn context(&self, name: &str) -> Result<&'a TaxonomyContext, TnrsError> {
        self.contexts
            .find(name)
            .ok_or_else(|| TnrsError::UnknownContext(name.to_string()))
    }

    fn accepts(&self, id: TaxonId) -> Result<bool, StoreError> {
        Ok(self.config.include_dubious || !self.graph.taxon(id)?.dubious)
    }

    /// Exact matches for `name` within `context`.
    ///
    /// A single hit is a perfect match. Several hits are all returned as
    /// homonyms, none of them perfect; choosing between them is left to the
    /// caller.
    ///
    /// # Errors
    ///
    /// Returns [`TnrsError::BackingStore`] if the index or graph fails.
    pub fn match_exact(
        &self,
        name: &str,
        context: &TaxonomyContext,
    ) -> Result<TnrsMatchSet, TnrsError> {
        if name.trim().is_empty() {
            return Ok(TnrsMatchSet::new());
        }

        let query = self.index.escape_query(name);
        let mut taxa = Vec::new();
        for id in self.index.exact_lookup(context, &query)? {
            let taxon = self.graph.taxon(id)?;
            if self.config.include_dubious || !taxon.dubious {
                taxa.push(taxon);
            }
        }

        let is_homonym = taxa.len() > 1;
        if is_homonym {
            tracing::debug!("'{}' is a homonym: {} taxa in {}", name, taxa.len(), context.tag);
        }
        Ok(taxa
            .into_iter()
            .map(|taxon| TnrsHit::exact(taxon, name, &self.source, is_homonym))
            .collect())
    }

    /// Approximate matches for `name` within `context`, scored against the
    /// candidates' canonical names and down-weighted outside `lica`.
    ///
    /// Candidates scoring below `min_score` are dropped silently.
    ///
    /// # Errors
    ///
    /// Returns [`TnrsError::BackingStore`] if the index or graph fails.
    pub fn match_approx(
        &self,
        name: &str,
        context: &TaxonomyContext,
        lica: TaxonId,
        min_score: f64,
    ) -> Result<TnrsMatchSet, TnrsError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Ok(TnrsMatchSet::new());
        }

        let query = self.index.escape_query(trimmed);
        let candidates = self.index.fuzzy_lookup(
            context,
            &query,
            min_identity_for(trimmed),
            self.config.max_fuzzy_candidates,
        )?;

        let mut matches = TnrsMatchSet::new();
        for id in candidates {
            let taxon = self.graph.taxon(id)?;
            if !self.config.include_dubious && taxon.dubious {
                continue;
            }

            let context_distance = if self.graph.is_descendant_of(id, lica)? {
                None
            } else {
                Some(self.graph.hierarchical_distance(id, lica)?)
            };
            let score = FuzzyScore::calculate(trimmed, &taxon.name, context_distance);
            if score.passes(min_score) {
                matches.add(TnrsHit::approximate(taxon, name, &self.source, score.score));
            } else {
                tracing::debug!(
                    "Dropped '{}' for '{}': score {:.3} below {:.3}",
                    taxon.name,
                    name,
                    score.score,
                    min_score
                );
            }
        }
        Ok(matches)
    }

    /// Infer the narrowest context covering `names`
    ///
    /// # Errors
    ///
    /// Returns [`TnrsError::BackingStore`] if the index or graph fails.
    pub fn infer_context(&self, names: &[String]) -> Result<ContextInference, TnrsError> {
        let inference = infer_context(self.graph, self.index, self.contexts, names, |id| {
            self.accepts(id)
        })?;
        Ok(inference)
    }

    /// Resolve a batch of names.
    ///
    /// Without an `initial_context` the context is inferred from the names'
    /// unambiguous exact matches; with one, matching happens directly inside it.
    /// Names are then matched exactly within the context, and names still
    /// without hits are matched approximately if enabled. Every name ends up
    /// matched directly, matched approximately, or unmatched.
    ///
    /// # Errors
    ///
    /// Returns [`TnrsError::BackingStore`] if the index or graph fails.
    pub fn resolve<S: AsRef<str>>(
        &self,
        names: &[S],
        initial_context: Option<&TaxonomyContext>,
    ) -> Result<TnrsResults, TnrsError> {
        let mut results = TnrsResults::new();

        let mut unique: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            if !unique.iter().any(|n| n == name) {
                unique.push(name.to_string());
            }
        }
        if unique.is_empty() {
            return Ok(results);
        }

        let (context, lica, pending) = match initial_context {
            Some(context) => (context.clone(), context.root, unique),
            None => {
                let inference = self.infer_context(&unique)?;
                for (name, id) in &inference.exact_matches {
                    let taxon = self.graph.taxon(*id)?;
                    let hit = TnrsHit::exact(taxon, name, &self.source, false);
                    results.record_exact(name, std::iter::once(hit).collect());
                }
                (inference.context, inference.lica, inference.deferred_names)
            }
        };

        let mut remaining = Vec::new();
        for name in pending {
            if results.is_finalized(&name) {
                continue;
            }
            let matches = self.match_exact(&name, &context)?;
            if matches.is_empty() {
                remaining.push(name);
            } else {
                results.record_exact(&name, matches);
            }
        }

        if self.config.do_approximate_matching && !remaining.is_empty() {
            results.set_includes_approximate_matches(true);
            for name in &remaining {
                let matches = self.match_approx(name, &context, lica, self.config.min_score)?;
                if matches.is_empty() {
                    results.mark_unmatched(name);
                } else {
                    results.record_approximate(name, matches);
                }
            }
        } else {
            for name in &remaining {
                results.mark_unmatched(name);
            }
        }

        tracing::debug!(
            "Resolved {} names in {}: {} direct, {} approximate, {} unmatched",
            names.len(),
            context.tag,
            results.names_with_direct_matches().len(),
            results.names_with_approximate_matches().len(),
            results.unmatched_names().len()
        );

        results.set_context(context);
        results.set_lica(lica);
        Ok(results)
    }

    /// Least inclusive common ancestor of `ids`; unknown ids are reported,
    /// not fatal.
    ///
    /// # Errors
    ///
    /// Returns [`TnrsError::BackingStore`] if the graph fails for a known id.
    pub fn lica(&self, ids: &[TaxonId]) -> Result<LicaResult, TnrsError> {
        let mut ids_used = Vec::new();
        let mut ids_not_found = Vec::new();
        for &id in ids {
            match self.graph.taxon(id) {
                Ok(_) => ids_used.push(id),
                Err(StoreError::TaxonNotFound(_)) => ids_not_found.push(id),
                Err(e) => return Err(e.into()),
            }
        }

        let set: TaxonSet = ids_used.iter().copied().collect();
        let lica = if set.is_empty() {
            None
        } else {
            Some(self.graph.taxon(set.mrca(self.graph)?)?)
        };

        Ok(LicaResult {
            lica,
            ids_used: set.taxa().to_vec(),
            ids_not_found,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::NomenclaturalCode;
    use crate::taxonomy::index::TaxonNameIndex;
    use crate::taxonomy::store::Taxonomy;

    fn taxonomy() -> Taxonomy {
        Taxonomy::from_taxa(vec![
            Taxon::new(1, "life"),
            Taxon::new(2, "Metazoa").with_parent(1),
            Taxon::new(3, "Aves").with_parent(2),
            Taxon::new(4, "Morus").with_parent(3).with_code(NomenclaturalCode::Iczn),
            Taxon::new(5, "Morus bassanus").with_parent(4),
            Taxon::new(6, "Embryophyta").with_parent(1),
            Taxon::new(7, "rosids").with_parent(6),
            Taxon::new(8, "Morus").with_parent(7).with_code(NomenclaturalCode::Icn),
            Taxon::new(9, "Morus alba").with_parent(8),
            Taxon::new(10, "Quercus")
                .with_parent(7)
                .with_code(NomenclaturalCode::Icn)
                .with_synonyms(["Cerris"]),
            Taxon::new(11, "Quercus robur").with_parent(10),
            Taxon::new(12, "Sula").with_parent(3).dubious(),
            Taxon::new(13, "Lonicera").with_parent(7),
        ])
        .unwrap()
    }

    struct Fixture {
        taxonomy: Taxonomy,
        index: TaxonNameIndex,
        contexts: ContextRegistry,
    }

    fn fixture() -> Fixture {
        let taxonomy = taxonomy();
        let index = TaxonNameIndex::build(&taxonomy);
        let contexts = taxonomy.context_registry();
        Fixture {
            taxonomy,
            index,
            contexts,
        }
    }

    impl Fixture {
        fn engine(&self) -> MatchingEngine<'_, Taxonomy, TaxonNameIndex> {
            MatchingEngine::new(&self.taxonomy, &self.index, &self.contexts)
        }
    }

    #[test]
    fn test_hits_carry_taxonomy_source_name() {
        let mut f = fixture();
        f.taxonomy.name = "ott-3.6".to_string();
        let results = f.engine().resolve(&["Quercus robur", "Qercus"], None).unwrap();
        let sources: Vec<&str> = results
            .iter()
            .flat_map(|r| r.matches.iter())
            .map(|hit| hit.source.as_str())
            .collect();
        assert!(!sources.is_empty());
        assert!(sources.iter().all(|s| *s == "ott-3.6"));

        let relabelled = f.engine().with_source("mirror");
        let hits = relabelled.match_exact("Quercus", f.contexts.root()).unwrap();
        assert_eq!(hits.iter().next().unwrap().source, "mirror");
    }

    #[test]
    fn test_match_exact_single_hit_is_perfect() {
        let f = fixture();
        let engine = f.engine();
        let matches = engine.match_exact("Quercus", f.contexts.root()).unwrap();
        assert_eq!(matches.len(), 1);
        let hit = matches.iter().next().unwrap();
        assert!(hit.is_perfect_match);
        assert!(!hit.is_homonym);
        assert!((hit.score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_match_exact_homonyms_are_all_returned() {
        let f = fixture();
        let engine = f.engine();
        let matches = engine.match_exact("Morus", f.contexts.root()).unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|h| h.is_homonym && !h.is_perfect_match));

        // Scoped to plants the name is unambiguous
        let plants = f.contexts.get("LAND_PLANTS").unwrap();
        let matches = engine.match_exact("Morus", plants).unwrap();
        assert_eq!(matches.len(), 1);
        assert!(matches.has_perfect_match());
        assert_eq!(matches.iter().next().unwrap().taxon_id(), TaxonId(8));
    }

    #[test]
    fn test_match_exact_synonym() {
        let f = fixture();
        let engine = f.engine();
        let matches = engine.match_exact("cerris", f.contexts.root()).unwrap();
        let hit = matches.iter().next().unwrap();
        assert_eq!(hit.taxon_id(), TaxonId(10));
        assert!(hit.is_synonym);
        assert!(hit.is_perfect_match);
    }

    #[test]
    fn test_match_exact_treats_query_syntax_literally() {
        let f = fixture();
        let engine = f.engine();
        assert!(engine.match_exact("Quer*", f.contexts.root()).unwrap().is_empty());
        assert!(engine.match_exact("Quercus?", f.contexts.root()).unwrap().is_empty());
        assert!(engine.match_exact("(Quercus)", f.contexts.root()).unwrap().is_empty());
    }

    #[test]
    fn test_match_exact_excludes_dubious_when_configured() {
        let f = fixture();
        let config = MatchingConfig {
            include_dubious: false,
            ..MatchingConfig::default()
        };
        let engine = MatchingEngine::with_config(&f.taxonomy, &f.index, &f.contexts, config);
        assert!(engine.match_exact("Sula", f.contexts.root()).unwrap().is_empty());
        assert_eq!(f.engine().match_exact("Sula", f.contexts.root()).unwrap().len(), 1);
    }

    #[test]
    fn test_match_approx_inside_lica() {
        let f = fixture();
        let engine = f.engine();
        let matches = engine
            .match_approx("Qercus", f.contexts.root(), TaxonId(7), DEFAULT_MIN_SCORE)
            .unwrap();
        assert_eq!(matches.len(), 1);
        let hit = matches.iter().next().unwrap();
        assert_eq!(hit.taxon_id(), TaxonId(10));
        assert!(hit.is_approximate);
        assert!(!hit.is_perfect_match);
        assert_eq!(hit.nomenclature_code, None);
        assert!((hit.score - 5.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_match_approx_outside_lica_is_down_weighted() {
        let f = fixture();
        let engine = f.engine();
        let inside = engine
            .match_approx("Quercus robor", f.contexts.root(), TaxonId(7), 0.0)
            .unwrap();
        // Morus bassanus is eight edges away from Quercus robur
        let outside = engine
            .match_approx("Quercus robor", f.contexts.root(), TaxonId(5), 0.0)
            .unwrap();
        let inside_score = inside.iter().next().unwrap().score;
        let outside_score = outside.iter().next().unwrap().score;
        assert!(outside_score < inside_score);
        assert!((outside_score - inside_score / 8f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn test_match_approx_respects_min_score() {
        let f = fixture();
        let engine = f.engine();
        let matches = engine
            .match_approx("Qercus", f.contexts.root(), TaxonId(7), 0.9)
            .unwrap();
        assert!(matches.is_empty());
        assert!(engine
            .match_approx("", f.contexts.root(), TaxonId(7), 0.0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_resolve_infers_context() {
        let f = fixture();
        let engine = f.engine();
        let results = engine
            .resolve(&["Quercus robur", "Morus", "Qercus"], None)
            .unwrap();

        assert_eq!(results.context().unwrap().tag, "ROSIDS");
        assert_eq!(results.lica(), Some(TaxonId(11)));

        // The homonym is unambiguous inside the inferred context
        let morus = results.get("Morus").unwrap();
        assert_eq!(morus.matches.len(), 1);
        assert!(morus.matches.has_perfect_match());
        assert_eq!(morus.matches.iter().next().unwrap().taxon_id(), TaxonId(8));

        assert!(results.names_with_approximate_matches().contains("Qercus"));
        assert!(results.includes_approximate_matches());
        assert!(results.unmatched_names().is_empty());
    }

    #[test]
    fn test_resolve_with_explicit_context() {
        let f = fixture();
        let engine = f.engine();
        let birds = engine.context("Birds").unwrap();
        let results = engine.resolve(&["Morus", "Quercus"], Some(birds)).unwrap();

        assert_eq!(results.context().unwrap().tag, "BIRDS");
        let morus = results.get("Morus").unwrap();
        assert_eq!(morus.matches.iter().next().unwrap().taxon_id(), TaxonId(4));
        assert!(results.unmatched_names().contains("Quercus"));
    }

    #[test]
    fn test_resolve_without_approximate_matching() {
        let f = fixture();
        let config = MatchingConfig {
            do_approximate_matching: false,
            ..MatchingConfig::default()
        };
        let engine = MatchingEngine::with_config(&f.taxonomy, &f.index, &f.contexts, config);
        let results = engine.resolve(&["Qercus"], None).unwrap();
        assert!(results.is_empty());
        assert!(!results.includes_approximate_matches());
        assert!(results.unmatched_names().contains("Qercus"));
    }

    #[test]
    fn test_resolve_deduplicates_and_handles_blank_names() {
        let f = fixture();
        let engine = f.engine();
        let results = engine.resolve(&["Lonicera", "Lonicera", ""], None).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results.unmatched_names().contains(""));
    }

    #[test]
    fn test_unknown_context() {
        let f = fixture();
        let engine = f.engine();
        assert!(matches!(
            engine.context("Mammals"),
            Err(TnrsError::UnknownContext(_))
        ));
    }

    #[test]
    fn test_lica_reports_unknown_ids() {
        let f = fixture();
        let engine = f.engine();
        let result = engine
            .lica(&[TaxonId(9), TaxonId(11), TaxonId(999)])
            .unwrap();
        assert_eq!(result.lica.unwrap().id, TaxonId(7));
        assert_eq!(result.ids_used, vec![TaxonId(9), TaxonId(11)]);
        assert_eq!(result.ids_not_found, vec![TaxonId(999)]);

        let none = engine.lica(&[TaxonId(999)]).unwrap();
        assert!(none.lica.is_none());
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: MatchingConfig = serde_json::from_str(r#"{"min_score": 0.9}"#).unwrap();
        assert!((config.min_score - 0.9).abs() < f64::EPSILON);
        assert!(config.do_approximate_matching);
        assert_eq!(config.max_fuzzy_candidates, DEFAULT_MAX_FUZZY_CANDIDATES);
    }
}
