use std::collections::BTreeSet;

use serde::Serialize;

use crate::core::context::{ContextRegistry, TaxonomyContext};
use crate::core::types::TaxonId;
use crate::matching::mrca::TaxonSet;
use crate::taxonomy::graph::{StoreError, TaxonGraphView};
use crate::taxonomy::index::NameIndex;

/// Narrowest context covering a batch of names, plus what was learned on the way
#[derive(Debug, Clone, Serialize)]
pub struct ContextInference {
    pub context: TaxonomyContext,

    /// LICA of the unambiguous exact matches, or the taxonomy root
    pub lica: TaxonId,

    /// Names with exactly one exact hit in the whole taxonomy
    pub exact_matches: Vec<(String, TaxonId)>,

    /// Names that still need matching, in input order
    pub deferred_names: Vec<String>,

    /// Deferred names that had several exact hits
    pub ambiguous_names: BTreeSet<String>,
}

impl ContextInference {
    /// Deferred names that had no exact hit at all
    pub fn unmatched_names(&self) -> impl Iterator<Item = &str> {
        self.deferred_names
            .iter()
            .filter(|n| !self.ambiguous_names.contains(*n))
            .map(String::as_str)
    }
}

/// Infer the context of `names` from their unambiguous exact matches.
///
/// Each name is looked up in the unscoped context. Names with a single hit
/// contribute that taxon to the LICA computation; homonyms and misses are
/// deferred. The context is the least inclusive context of the LICA, or the
/// all-taxa context when nothing matched unambiguously or the LICA is the root.
/// `accept` filters candidate taxa before hits are counted.
///
/// # Errors
///
/// Propagates index and graph failures.
pub fn infer_context<G, I, F>(
    graph: &G,
    index: &I,
    registry: &ContextRegistry,
    names: &[String],
    accept: F,
) -> Result<ContextInference, StoreError>
where
    G: TaxonGraphView + ?Sized,
    I: NameIndex + ?Sized,
    F: Fn(TaxonId) -> Result<bool, StoreError>,
{
    let root_context = registry.root();
    let mut exact_matches = Vec::new();
    let mut deferred_names = Vec::new();
    let mut ambiguous_names = BTreeSet::new();

    for name in names {
        if name.trim().is_empty() {
            deferred_names.push(name.clone());
            continue;
        }
        let query = index.escape_query(name);
        let mut hits = Vec::new();
        for id in index.exact_lookup(root_context, &query)? {
            if accept(id)? {
                hits.push(id);
            }
        }
        match hits.as_slice() {
            [id] => exact_matches.push((name.clone(), *id)),
            [] => deferred_names.push(name.clone()),
            _ => {
                ambiguous_names.insert(name.clone());
                deferred_names.push(name.clone());
            }
        }
    }

    let matched: TaxonSet = exact_matches.iter().map(|(_, id)| *id).collect();
    let lica = if matched.is_empty() {
        graph.root()
    } else {
        matched.mrca(graph)?
    };

    let context = if lica == graph.root() {
        root_context.clone()
    } else {
        match graph.taxon(lica)?.least_context.as_deref() {
            Some(tag) => registry.by_tag(tag).clone(),
            None => {
                tracing::debug!("Taxon {lica} has no least inclusive context");
                root_context.clone()
            }
        }
    };

    tracing::debug!(
        "Inferred context {} (LICA {}) from {} of {} names",
        context.tag,
        lica,
        exact_matches.len(),
        names.len()
    );

    Ok(ContextInference {
        context,
        lica,
        exact_matches,
        deferred_names,
        ambiguous_names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::taxon::Taxon;
    use crate::taxonomy::index::TaxonNameIndex;
    use crate::taxonomy::store::Taxonomy;

    fn taxonomy() -> Taxonomy {
        Taxonomy::from_taxa(vec![
            Taxon::new(1, "life"),
            Taxon::new(2, "Metazoa").with_parent(1),
            Taxon::new(3, "Aves").with_parent(2),
            Taxon::new(4, "Morus").with_parent(3),
            Taxon::new(5, "Morus bassanus").with_parent(4),
            Taxon::new(6, "Embryophyta").with_parent(1),
            Taxon::new(7, "rosids").with_parent(6),
            Taxon::new(8, "Morus").with_parent(7),
            Taxon::new(9, "Morus alba").with_parent(8),
            Taxon::new(10, "Quercus").with_parent(7),
            Taxon::new(11, "Sula").with_parent(3).dubious(),
        ])
        .unwrap()
    }

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    fn accept_all(_: TaxonId) -> Result<bool, StoreError> {
        Ok(true)
    }

    #[test]
    fn test_infers_narrowest_context() {
        let taxonomy = taxonomy();
        let index = TaxonNameIndex::build(&taxonomy);
        let registry = taxonomy.context_registry();

        let inference = infer_context(
            &taxonomy,
            &index,
            &registry,
            &names(&["Morus alba", "Quercus"]),
            accept_all,
        )
        .unwrap();
        assert_eq!(inference.lica, TaxonId(7));
        assert_eq!(inference.context.tag, "ROSIDS");
        assert_eq!(inference.exact_matches.len(), 2);
        assert!(inference.deferred_names.is_empty());
    }

    #[test]
    fn test_homonyms_are_deferred() {
        let taxonomy = taxonomy();
        let index = TaxonNameIndex::build(&taxonomy);
        let registry = taxonomy.context_registry();

        let inference =
            infer_context(&taxonomy, &index, &registry, &names(&["Morus"]), accept_all).unwrap();
        assert!(inference.exact_matches.is_empty());
        assert_eq!(inference.deferred_names, names(&["Morus"]));
        assert!(inference.ambiguous_names.contains("Morus"));
        assert_eq!(inference.unmatched_names().count(), 0);
        assert_eq!(inference.lica, TaxonId(1));
        assert!(inference.context.is_all_taxa());
    }

    #[test]
    fn test_unmatched_names_fall_back_to_root() {
        let taxonomy = taxonomy();
        let index = TaxonNameIndex::build(&taxonomy);
        let registry = taxonomy.context_registry();

        let inference = infer_context(
            &taxonomy,
            &index,
            &registry,
            &names(&["Qercus", "  "]),
            accept_all,
        )
        .unwrap();
        assert!(inference.context.is_all_taxa());
        assert_eq!(inference.unmatched_names().collect::<Vec<_>>(), vec!["Qercus", "  "]);
    }

    #[test]
    fn test_cross_kingdom_batch_is_unscoped() {
        let taxonomy = taxonomy();
        let index = TaxonNameIndex::build(&taxonomy);
        let registry = taxonomy.context_registry();

        let inference = infer_context(
            &taxonomy,
            &index,
            &registry,
            &names(&["Morus bassanus", "Morus alba"]),
            accept_all,
        )
        .unwrap();
        assert_eq!(inference.lica, TaxonId(1));
        assert!(inference.context.is_all_taxa());
    }

    #[test]
    fn test_single_match_sets_its_own_context() {
        let taxonomy = taxonomy();
        let index = TaxonNameIndex::build(&taxonomy);
        let registry = taxonomy.context_registry();

        let inference = infer_context(
            &taxonomy,
            &index,
            &registry,
            &names(&["Morus bassanus", "Morus"]),
            accept_all,
        )
        .unwrap();
        assert_eq!(inference.lica, TaxonId(5));
        assert_eq!(inference.context.tag, "BIRDS");
    }

    #[test]
    fn test_rejected_candidates_do_not_count() {
        let taxonomy = taxonomy();
        let index = TaxonNameIndex::build(&taxonomy);
        let registry = taxonomy.context_registry();

        let not_dubious =
            |id: TaxonId| -> Result<bool, StoreError> { Ok(!taxonomy.taxon(id)?.dubious) };
        let inference =
            infer_context(&taxonomy, &index, &registry, &names(&["Sula"]), not_dubious).unwrap();
        assert!(inference.exact_matches.is_empty());
        assert_eq!(inference.unmatched_names().collect::<Vec<_>>(), vec!["Sula"]);
    }
}
