use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::core::context::{ContextRegistry, CONTEXT_DESCRIPTIONS};
use crate::core::taxon::Taxon;
use crate::core::types::TaxonId;
use crate::taxonomy::graph::{StoreError, TaxonGraphView};

#[derive(Error, Debug)]
pub enum TaxonomyError {
    #[error("Failed to read taxonomy: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse taxonomy: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Duplicate taxon id: {0}")]
    DuplicateId(TaxonId),

    #[error("Taxon {child} refers to missing parent {parent}")]
    MissingParent { child: TaxonId, parent: TaxonId },

    #[error("Taxonomy has no root taxon")]
    NoRoot,

    #[error("Taxonomy has multiple roots: {0} and {1}")]
    MultipleRoots(TaxonId, TaxonId),

    #[error("{0} taxa are not reachable from the root")]
    Disconnected(usize),
}

/// Taxonomy file format version for compatibility checking
pub const TAXONOMY_FORMAT_VERSION: &str = "1.0.0";

/// Source label reported on hits when a taxonomy file does not name itself
pub const DEFAULT_TAXONOMY_NAME: &str = "ott";

fn default_taxonomy_name() -> String {
    DEFAULT_TAXONOMY_NAME.to_string()
}

/// Serializable taxonomy format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyData {
    pub version: String,
    #[serde(default = "default_taxonomy_name")]
    pub name: String,
    #[serde(default)]
    pub created_at: String,
    pub taxa: Vec<Taxon>,
}

/// A taxon with its position in the hierarchy
#[derive(Debug, Clone, Serialize)]
pub struct TaxonReport {
    pub taxon: Arc<Taxon>,
    pub depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineage: Option<Vec<Arc<Taxon>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Arc<Taxon>>>,
}

/// Preorder interval of a taxon's subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub enter: u32,
    pub exit: u32,
    pub depth: u32,
}

impl Span {
    pub fn contains(self, other: Span) -> bool {
        self.enter <= other.enter && other.exit <= self.exit
    }
}

/// In-memory taxonomy with hierarchy indexes
#[derive(Debug)]
pub struct Taxonomy {
    /// Source label, e.g. "ott"
    pub name: String,

    taxa: HashMap<TaxonId, Arc<Taxon>>,

    /// Taxon ids in preorder
    preorder: Vec<TaxonId>,

    children: HashMap<TaxonId, Vec<TaxonId>>,

    spans: HashMap<TaxonId, Span>,

    root: TaxonId,
}

impl Taxonomy {
    /// Load the embedded demo taxonomy
    pub fn load_embedded() -> Result<Self, TaxonomyError> {
        // Validated at compile time via build.rs
        const EMBEDDED_TAXONOMY: &str = include_str!("../../taxonomies/demo_taxonomy.json");
        Self::from_json(EMBEDDED_TAXONOMY)
    }

    /// Load a taxonomy from a JSON file, gzip-compressed if the name ends in `.gz`
    pub fn load_from_file(path: &Path) -> Result<Self, TaxonomyError> {
        let is_gzip = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("gz"));

        let content = if is_gzip {
            let file = std::fs::File::open(path)?;
            let mut decoder = flate2::read::GzDecoder::new(file);
            let mut content = String::new();
            decoder.read_to_string(&mut content)?;
            content
        } else {
            std::fs::read_to_string(path)?
        };
        Self::from_json(&content)
    }

    /// Parse a taxonomy from a JSON string
    pub fn from_json(json: &str) -> Result<Self, TaxonomyError> {
        let data: TaxonomyData = serde_json::from_str(json)?;

        // Version check (warn but don't fail)
        if data.version != TAXONOMY_FORMAT_VERSION {
            tracing::warn!(
                "Taxonomy format version mismatch (expected {}, found {})",
                TAXONOMY_FORMAT_VERSION,
                data.version
            );
        }

        let mut taxonomy = Self::from_taxa(data.taxa)?;
        taxonomy.name = data.name;
        Ok(taxonomy)
    }

    /// Build a taxonomy from a list of taxa.
    ///
    /// Validates the hierarchy (unique ids, a single root, no dangling parents,
    /// everything reachable from the root), computes subtree spans and assigns
    /// least inclusive context tags to taxa that lack one.
    pub fn from_taxa(taxa: Vec<Taxon>) -> Result<Self, TaxonomyError> {
        let mut by_id: HashMap<TaxonId, Taxon> = HashMap::with_capacity(taxa.len());
        let mut children: HashMap<TaxonId, Vec<TaxonId>> = HashMap::new();
        let mut root: Option<TaxonId> = None;

        for taxon in &taxa {
            match taxon.parent {
                Some(parent) => children.entry(parent).or_default().push(taxon.id),
                None => {
                    if let Some(existing) = root {
                        return Err(TaxonomyError::MultipleRoots(existing, taxon.id));
                    }
                    root = Some(taxon.id);
                }
            }
        }
        for taxon in taxa {
            let id = taxon.id;
            if by_id.insert(id, taxon).is_some() {
                return Err(TaxonomyError::DuplicateId(id));
            }
        }
        let root = root.ok_or(TaxonomyError::NoRoot)?;
        for taxon in by_id.values() {
            if let Some(parent) = taxon.parent {
                if !by_id.contains_key(&parent) {
                    return Err(TaxonomyError::MissingParent {
                        child: taxon.id,
                        parent,
                    });
                }
            }
        }

        let context_roots = unique_context_roots(&by_id);
        let (preorder, spans) = walk_hierarchy(root, &children, &mut by_id, &context_roots);

        if preorder.len() != by_id.len() {
            return Err(TaxonomyError::Disconnected(by_id.len() - preorder.len()));
        }

        Ok(Self {
            name: DEFAULT_TAXONOMY_NAME.to_string(),
            taxa: by_id.into_iter().map(|(id, t)| (id, Arc::new(t))).collect(),
            preorder,
            children,
            spans,
            root,
        })
    }

    /// Export taxonomy to JSON
    pub fn to_json(&self) -> Result<String, TaxonomyError> {
        let data = TaxonomyData {
            version: TAXONOMY_FORMAT_VERSION.to_string(),
            name: self.name.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
            taxa: self.iter().map(|t| (**t).clone()).collect(),
        };
        Ok(serde_json::to_string_pretty(&data)?)
    }

    /// Get a taxon by id
    pub fn get(&self, id: TaxonId) -> Option<&Arc<Taxon>> {
        self.taxa.get(&id)
    }

    /// Ids of taxa whose canonical name matches, case-insensitively, in preorder
    pub fn find_by_name(&self, name: &str) -> Vec<TaxonId> {
        self.iter()
            .filter(|t| t.is_named(name))
            .map(|t| t.id)
            .collect()
    }

    /// Direct children of a taxon
    pub fn children(&self, id: TaxonId) -> &[TaxonId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of edges between a taxon and the root
    pub fn depth(&self, id: TaxonId) -> Option<usize> {
        self.spans.get(&id).map(|s| s.depth as usize)
    }

    pub(crate) fn span(&self, id: TaxonId) -> Option<Span> {
        self.spans.get(&id).copied()
    }

    /// All taxa in preorder, root first
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Taxon>> {
        self.preorder.iter().filter_map(|id| self.taxa.get(id))
    }

    /// Bind the known context descriptions to this taxonomy's taxa
    pub fn context_registry(&self) -> ContextRegistry {
        ContextRegistry::build(self.root, |root_name| {
            let mut candidates = self
                .iter()
                .filter(|t| !t.deprecated && t.name == root_name)
                .map(|t| t.id);
            match (candidates.next(), candidates.next()) {
                (Some(id), None) => Some(id),
                (Some(_), Some(_)) => {
                    tracing::warn!("Context root name '{root_name}' is ambiguous");
                    None
                }
                _ => None,
            }
        })
    }

    /// Content fingerprint: MD5 over the sorted (id, parent, name) records.
    ///
    /// Two taxonomies with the same fingerprint have identical hierarchies and names.
    pub fn fingerprint(&self) -> String {
        let mut ids: Vec<&TaxonId> = self.taxa.keys().collect();
        ids.sort_unstable();

        let mut context = md5::Context::new();
        for id in ids {
            let taxon = &self.taxa[id];
            let parent = taxon.parent.map_or_else(|| "-".to_string(), |p| p.to_string());
            context.consume(format!("{id}\t{parent}\t{}\n", taxon.name).as_bytes());
        }
        format!("{:x}", context.compute())
    }

    /// Describe a taxon, optionally with its lineage (parent first, root
    /// last) and its direct children.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TaxonNotFound`] for unknown ids.
    pub fn report(
        &self,
        id: TaxonId,
        include_lineage: bool,
        include_children: bool,
    ) -> Result<TaxonReport, StoreError> {
        let taxon = self.taxon(id)?;
        let depth = self.depth(id).unwrap_or_default();

        let lineage = if include_lineage {
            let mut lineage = Vec::with_capacity(depth);
            let mut current = taxon.parent;
            while let Some(parent) = current {
                let ancestor = self.taxon(parent)?;
                current = ancestor.parent;
                lineage.push(ancestor);
            }
            Some(lineage)
        } else {
            None
        };

        let children = if include_children {
            Some(
                self.children(id)
                    .iter()
                    .map(|child| self.taxon(*child))
                    .collect::<Result<Vec<_>, _>>()?,
            )
        } else {
            None
        };

        Ok(TaxonReport {
            taxon,
            depth,
            lineage,
            children,
        })
    }

    /// Number of taxa in the taxonomy
    pub fn len(&self) -> usize {
        self.taxa.len()
    }

    /// Check if taxonomy is empty
    pub fn is_empty(&self) -> bool {
        self.taxa.is_empty()
    }
}

impl TaxonGraphView for Taxonomy {
    fn root(&self) -> TaxonId {
        self.root
    }

    fn source_name(&self) -> &str {
        &self.name
    }

    fn taxon(&self, id: TaxonId) -> Result<Arc<Taxon>, StoreError> {
        self.taxa
            .get(&id)
            .cloned()
            .ok_or(StoreError::TaxonNotFound(id))
    }

    fn parent(&self, id: TaxonId) -> Result<Option<TaxonId>, StoreError> {
        self.taxa
            .get(&id)
            .map(|t| t.parent)
            .ok_or(StoreError::TaxonNotFound(id))
    }

    fn is_descendant_of(&self, id: TaxonId, ancestor: TaxonId) -> Result<bool, StoreError> {
        let span = self.span(id).ok_or(StoreError::TaxonNotFound(id))?;
        let ancestor_span = self
            .span(ancestor)
            .ok_or(StoreError::TaxonNotFound(ancestor))?;
        Ok(ancestor_span.contains(span))
    }
}

/// Context tag for each context root name that names exactly one live taxon
fn unique_context_roots(taxa: &HashMap<TaxonId, Taxon>) -> HashMap<&'static str, &'static str> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for taxon in taxa.values().filter(|t| !t.deprecated) {
        *counts.entry(taxon.name.as_str()).or_default() += 1;
    }

    CONTEXT_DESCRIPTIONS
        .iter()
        .filter(|d| !d.root_name.is_empty() && counts.get(d.root_name) == Some(&1))
        .map(|d| (d.root_name, d.tag))
        .collect()
}

/// Depth-first walk from the root computing preorder spans.
///
/// Fills in missing least inclusive context tags on the way down: entering a
/// context root switches the tag for its whole subtree.
fn walk_hierarchy(
    root: TaxonId,
    children: &HashMap<TaxonId, Vec<TaxonId>>,
    taxa: &mut HashMap<TaxonId, Taxon>,
    context_roots: &HashMap<&'static str, &'static str>,
) -> (Vec<TaxonId>, HashMap<TaxonId, Span>) {
    enum Visit {
        Enter(TaxonId, u32, String),
        Exit(TaxonId),
    }

    let mut preorder = Vec::with_capacity(taxa.len());
    let mut spans: HashMap<TaxonId, Span> = HashMap::with_capacity(taxa.len());
    let mut stack = vec![Visit::Enter(
        root,
        0,
        crate::core::context::ALL_TAXA_TAG.to_string(),
    )];
    let mut counter: u32 = 0;

    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Enter(id, depth, inherited) => {
                let Some(taxon) = taxa.get_mut(&id) else {
                    continue;
                };
                let tag = match (&taxon.least_context, context_roots.get(taxon.name.as_str())) {
                    (Some(explicit), _) => explicit.clone(),
                    (None, Some(&tag)) if !taxon.deprecated => tag.to_string(),
                    (None, _) => inherited,
                };
                taxon.least_context = Some(tag.clone());

                preorder.push(id);
                spans.insert(
                    id,
                    Span {
                        enter: counter,
                        exit: counter,
                        depth,
                    },
                );
                counter += 1;

                stack.push(Visit::Exit(id));
                if let Some(kids) = children.get(&id) {
                    for &child in kids.iter().rev() {
                        stack.push(Visit::Enter(child, depth + 1, tag.clone()));
                    }
                }
            }
            Visit::Exit(id) => {
                if let Some(span) = spans.get_mut(&id) {
                    span.exit = counter.saturating_sub(1);
                }
            }
        }
    }

    (preorder, spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::ALL_TAXA_TAG;

    fn tiny() -> Taxonomy {
        Taxonomy::from_taxa(vec![
            Taxon::new(1, "life"),
            Taxon::new(2, "Metazoa").with_parent(1),
            Taxon::new(3, "Aves").with_parent(2),
            Taxon::new(4, "Morus").with_parent(3),
            Taxon::new(5, "Plantae").with_parent(1),
            Taxon::new(6, "Morus").with_parent(5),
        ])
        .unwrap()
    }

    #[test]
    fn test_load_embedded_taxonomy() {
        let taxonomy = Taxonomy::load_embedded().unwrap();
        assert!(!taxonomy.is_empty());
        assert_eq!(taxonomy.name, "ott-demo");
    }

    #[test]
    fn test_spans_and_descendants() {
        let taxonomy = tiny();
        assert!(taxonomy.is_descendant_of(TaxonId(4), TaxonId(2)).unwrap());
        assert!(taxonomy.is_descendant_of(TaxonId(4), TaxonId(1)).unwrap());
        assert!(taxonomy.is_descendant_of(TaxonId(3), TaxonId(3)).unwrap());
        assert!(!taxonomy.is_descendant_of(TaxonId(6), TaxonId(2)).unwrap());
        assert!(!taxonomy.is_descendant_of(TaxonId(2), TaxonId(4)).unwrap());
        assert_eq!(taxonomy.depth(TaxonId(4)), Some(3));
        assert_eq!(taxonomy.depth(TaxonId(1)), Some(0));
    }

    #[test]
    fn test_least_context_assignment() {
        let taxonomy = tiny();
        let context = |id: u64| taxonomy.get(TaxonId(id)).unwrap().least_context.clone();
        assert_eq!(context(1).as_deref(), Some(ALL_TAXA_TAG));
        assert_eq!(context(2).as_deref(), Some("METAZOA"));
        assert_eq!(context(4).as_deref(), Some("BIRDS"));
        assert_eq!(context(6).as_deref(), Some(ALL_TAXA_TAG));
    }

    #[test]
    fn test_context_registry_for_taxonomy() {
        let registry = tiny().context_registry();
        assert_eq!(registry.get("METAZOA").unwrap().root, TaxonId(2));
        assert_eq!(registry.get("BIRDS").unwrap().root, TaxonId(3));
        assert!(registry.get("ROSIDS").is_none());
    }

    #[test]
    fn test_find_by_name_and_children() {
        let taxonomy = tiny();
        assert_eq!(taxonomy.find_by_name("morus"), vec![TaxonId(4), TaxonId(6)]);
        assert_eq!(taxonomy.children(TaxonId(1)), &[TaxonId(2), TaxonId(5)]);
        assert!(taxonomy.children(TaxonId(4)).is_empty());
    }

    #[test]
    fn test_taxon_report() {
        let taxonomy = tiny();
        let report = taxonomy.report(TaxonId(4), true, true).unwrap();
        assert_eq!(report.taxon.name, "Morus");
        assert_eq!(report.depth, 3);
        let lineage: Vec<TaxonId> = report.lineage.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(lineage, vec![TaxonId(3), TaxonId(2), TaxonId(1)]);
        assert!(report.children.unwrap().is_empty());

        let root = taxonomy.report(TaxonId(1), false, true).unwrap();
        assert!(root.lineage.is_none());
        assert_eq!(root.children.unwrap().len(), 2);

        assert_eq!(
            taxonomy.report(TaxonId(42), false, false).unwrap_err(),
            StoreError::TaxonNotFound(TaxonId(42))
        );
    }

    #[test]
    fn test_validation_errors() {
        let no_root = Taxonomy::from_taxa(vec![Taxon::new(1, "a").with_parent(2)]);
        assert!(matches!(no_root, Err(TaxonomyError::NoRoot)));

        let two_roots = Taxonomy::from_taxa(vec![Taxon::new(1, "a"), Taxon::new(2, "b")]);
        assert!(matches!(two_roots, Err(TaxonomyError::MultipleRoots(_, _))));

        let duplicate = Taxonomy::from_taxa(vec![
            Taxon::new(1, "a"),
            Taxon::new(2, "b").with_parent(1),
            Taxon::new(2, "c").with_parent(1),
        ]);
        assert!(matches!(duplicate, Err(TaxonomyError::DuplicateId(_))));

        let dangling = Taxonomy::from_taxa(vec![
            Taxon::new(1, "a"),
            Taxon::new(2, "b").with_parent(9),
        ]);
        assert!(matches!(dangling, Err(TaxonomyError::MissingParent { .. })));

        let cycle = Taxonomy::from_taxa(vec![
            Taxon::new(1, "a"),
            Taxon::new(2, "b").with_parent(3),
            Taxon::new(3, "c").with_parent(2),
        ]);
        assert!(matches!(cycle, Err(TaxonomyError::Disconnected(2))));
    }

    #[test]
    fn test_rootless_taxonomy_is_not_reported_as_dangling() {
        // Every taxon points at a missing parent; the missing root is the real fault
        let rootless = Taxonomy::from_taxa(vec![
            Taxon::new(1, "a").with_parent(2),
            Taxon::new(3, "b").with_parent(1),
        ]);
        assert!(matches!(rootless, Err(TaxonomyError::NoRoot)));

        let dangling_below_root = Taxonomy::from_taxa(vec![
            Taxon::new(1, "life"),
            Taxon::new(2, "b").with_parent(7),
        ]);
        assert!(matches!(
            dangling_below_root,
            Err(TaxonomyError::MissingParent {
                child: TaxonId(2),
                parent: TaxonId(7)
            })
        ));
    }

    #[test]
    fn test_source_name_follows_taxonomy_name() {
        let mut taxonomy = tiny();
        assert_eq!(taxonomy.source_name(), DEFAULT_TAXONOMY_NAME);
        taxonomy.name = "gbif-backbone".to_string();
        assert_eq!(taxonomy.source_name(), "gbif-backbone");
    }

    #[test]
    fn test_json_round_trip_preserves_fingerprint() {
        let taxonomy = tiny();
        let json = taxonomy.to_json().unwrap();
        assert!(json.contains("\"created_at\""));

        let reloaded = Taxonomy::from_json(&json).unwrap();
        assert_eq!(reloaded.len(), taxonomy.len());
        assert_eq!(reloaded.fingerprint(), taxonomy.fingerprint());
    }

    #[test]
    fn test_fingerprint_changes_with_names() {
        let renamed = Taxonomy::from_taxa(vec![
            Taxon::new(1, "life"),
            Taxon::new(2, "Animalia").with_parent(1),
        ])
        .unwrap();
        let original = Taxonomy::from_taxa(vec![
            Taxon::new(1, "life"),
            Taxon::new(2, "Metazoa").with_parent(1),
        ])
        .unwrap();
        assert_ne!(renamed.fingerprint(), original.fingerprint());
    }

    #[test]
    fn test_load_gzipped_file() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let json = tiny().to_json().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taxonomy.json.gz");

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(json.as_bytes()).unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let loaded = Taxonomy::load_from_file(&path).unwrap();
        assert_eq!(loaded.len(), 6);
    }
}
