use std::cell::OnceCell;
use std::collections::HashMap;

use crate::core::types::TaxonId;
use crate::taxonomy::graph::{ancestry_path, StoreError, TaxonGraphView};

/// Most recent common ancestor (least inclusive common ancestor) of `taxa`.
///
/// Walks each taxon's ancestry from the leaf upwards until it meets the
/// ancestry of the first taxon; the shallowest meeting point over all taxa is
/// the common ancestor. The result does not depend on the order of `taxa`.
///
/// # Panics
///
/// Panics if `taxa` is empty: there is no common ancestor of nothing, and
/// asking for one is a caller bug.
///
/// # Errors
///
/// Propagates lookup failures, and reports taxa whose ancestries never meet
/// as [`StoreError::CorruptHierarchy`].
pub fn compute_mrca<G>(graph: &G, taxa: &[TaxonId]) -> Result<TaxonId, StoreError>
where
    G: TaxonGraphView + ?Sized,
{
    let (first, rest) = taxa
        .split_first()
        .expect("attempt to find the MRCA of zero taxa");
    if rest.is_empty() {
        return Ok(*first);
    }

    // Root-first ancestry of the reference taxon, with each node's depth
    let reference = ancestry_path(graph, *first)?;
    let depth_of: HashMap<TaxonId, usize> =
        reference.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    let mut mrca_depth = reference.len() - 1;
    for taxon in rest {
        if mrca_depth == 0 {
            break;
        }
        let path = ancestry_path(graph, *taxon)?;
        let meeting = path
            .iter()
            .rev()
            .find_map(|id| depth_of.get(id).copied())
            .ok_or_else(|| {
                StoreError::CorruptHierarchy(format!(
                    "taxa {first} and {taxon} have no common ancestor"
                ))
            })?;
        mrca_depth = mrca_depth.min(meeting);
    }

    Ok(reference[mrca_depth])
}

/// An ordered set of taxa with a lazily computed, memoised MRCA
#[derive(Debug, Clone, Default)]
pub struct TaxonSet {
    taxa: Vec<TaxonId>,
    mrca: OnceCell<TaxonId>,
}

impl TaxonSet {
    /// Create a set, dropping repeated taxa while keeping first occurrences in order
    pub fn new(taxa: impl IntoIterator<Item = TaxonId>) -> Self {
        let mut unique = Vec::new();
        for id in taxa {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        Self {
            taxa: unique,
            mrca: OnceCell::new(),
        }
    }

    /// The MRCA of the set, computed on first use and cached afterwards.
    ///
    /// # Panics
    ///
    /// Panics if the set is empty; check [`TaxonSet::is_empty`] first.
    ///
    /// # Errors
    ///
    /// Propagates lookup failures from [`compute_mrca`]. Failures are not cached.
    pub fn mrca<G>(&self, graph: &G) -> Result<TaxonId, StoreError>
    where
        G: TaxonGraphView + ?Sized,
    {
        if let Some(mrca) = self.mrca.get() {
            return Ok(*mrca);
        }
        let mrca = compute_mrca(graph, &self.taxa)?;
        Ok(*self.mrca.get_or_init(|| mrca))
    }

    /// Whether the MRCA has already been computed
    pub fn has_mrca(&self) -> bool {
        self.mrca.get().is_some()
    }

    pub fn taxa(&self) -> &[TaxonId] {
        &self.taxa
    }

    pub fn len(&self) -> usize {
        self.taxa.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taxa.is_empty()
    }
}

impl FromIterator<TaxonId> for TaxonSet {
    fn from_iter<T: IntoIterator<Item = TaxonId>>(iter: T) -> Self {
        Self::new(iter)
    }
}
