use std::sync::Arc;

use thiserror::Error;

use crate::core::taxon::Taxon;
use crate::core::types::TaxonId;
use crate::taxonomy::store::DEFAULT_TAXONOMY_NAME;

/// Failure of a taxonomy or index collaborator.
///
/// Distinct from "no match": these mean the backing data could not answer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Taxon not found: {0}")]
    TaxonNotFound(TaxonId),

    #[error("Corrupt taxonomy hierarchy: {0}")]
    CorruptHierarchy(String),

    #[error("Backing store unavailable: {0}")]
    Unavailable(String),
}

/// Upper bound on ancestry path length; deeper paths indicate a parent cycle
pub const MAX_ANCESTRY_DEPTH: usize = 10_000;

/// Read-only access to the taxonomic hierarchy
pub trait TaxonGraphView {
    /// The taxonomy root
    fn root(&self) -> TaxonId;

    /// Label identifying the taxonomy, reported as the source of every hit
    fn source_name(&self) -> &str {
        DEFAULT_TAXONOMY_NAME
    }

    /// Fetch a taxon by id
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TaxonNotFound`] for unknown ids.
    fn taxon(&self, id: TaxonId) -> Result<Arc<Taxon>, StoreError>;

    /// Parent of a taxon, `None` at the root
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TaxonNotFound`] for unknown ids.
    fn parent(&self, id: TaxonId) -> Result<Option<TaxonId>, StoreError> {
        Ok(self.taxon(id)?.parent)
    }

    /// Synonym names of a taxon
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TaxonNotFound`] for unknown ids.
    fn synonyms(&self, id: TaxonId) -> Result<Vec<String>, StoreError> {
        Ok(self.taxon(id)?.synonyms.clone())
    }

    /// True if `id` is `ancestor` or lies below it in the preferred classification
    ///
    /// # Errors
    ///
    /// Propagates lookup failures while walking the ancestry.
    fn is_descendant_of(&self, id: TaxonId, ancestor: TaxonId) -> Result<bool, StoreError> {
        Ok(ancestry_path(self, id)?.contains(&ancestor))
    }

    /// Number of edges on the path from `a` to `b` through their common ancestor
    ///
    /// # Errors
    ///
    /// Propagates lookup failures, and reports taxa without a common ancestor
    /// as [`StoreError::CorruptHierarchy`].
    fn hierarchical_distance(&self, a: TaxonId, b: TaxonId) -> Result<usize, StoreError> {
        let path_a = ancestry_path(self, a)?;
        let path_b = ancestry_path(self, b)?;
        let shared = path_a
            .iter()
            .zip(&path_b)
            .take_while(|(x, y)| x == y)
            .count();
        if shared == 0 {
            return Err(StoreError::CorruptHierarchy(format!(
                "taxa {a} and {b} have no common ancestor"
            )));
        }
        Ok(path_a.len() + path_b.len() - 2 * shared)
    }
}

/// Root-to-node ancestry of a taxon, the taxon itself last.
///
/// # Errors
///
/// Propagates lookup failures; a path longer than [`MAX_ANCESTRY_DEPTH`] is
/// reported as [`StoreError::CorruptHierarchy`].
pub fn ancestry_path<G>(graph: &G, id: TaxonId) -> Result<Vec<TaxonId>, StoreError>
where
    G: TaxonGraphView + ?Sized,
{
    let mut path = vec![id];
    let mut current = id;
    while let Some(parent) = graph.parent(current)? {
        if path.len() >= MAX_ANCESTRY_DEPTH {
            return Err(StoreError::CorruptHierarchy(format!(
                "ancestry of {id} exceeds {MAX_ANCESTRY_DEPTH} levels"
            )));
        }
        path.push(parent);
        current = parent;
    }
    path.reverse();
    Ok(path)
}
