//! Named taxonomic contexts used to scope name lookups.
//!
//! A context is a clade (the subtree below a root taxon) with its own name index
//! scope. The descriptions are static configuration; the registry binds each
//! description to a root taxon of the loaded taxonomy once, at startup.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::types::{ContextGroup, NomenclaturalCode, TaxonId};

/// Tag of the unscoped context covering the whole taxonomy
pub const ALL_TAXA_TAG: &str = "ALLTAXA";

/// Static definition of a taxonomic context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextDescription {
    /// Stable key, also stored as the least inclusive context tag of taxa
    pub tag: &'static str,
    /// Human-readable name
    pub label: &'static str,
    pub group: ContextGroup,
    /// Suffix naming the context's name index
    pub index_suffix: &'static str,
    /// Canonical name of the root taxon; empty for the whole taxonomy
    pub root_name: &'static str,
    pub code: NomenclaturalCode,
}

const fn describe(
    tag: &'static str,
    label: &'static str,
    group: ContextGroup,
    index_suffix: &'static str,
    root_name: &'static str,
    code: NomenclaturalCode,
) -> ContextDescription {
    ContextDescription {
        tag,
        label,
        group,
        index_suffix,
        root_name,
        code,
    }
}

use ContextGroup::{Animals, Fungi, Life, Microbes, Plants};
use NomenclaturalCode::{Icn, Icnp, Iczn, Undefined};

/// All known contexts. Root names must be unique within a taxonomy.
pub static CONTEXT_DESCRIPTIONS: &[ContextDescription] = &[
    describe(ALL_TAXA_TAG, "All life", Life, "", "", Undefined),
    // Microbes
    describe("BACTERIA", "Bacteria", Microbes, "Bacteria", "Bacteria", Icnp),
    describe("SAR", "SAR group", Microbes, "SAR", "SAR", Undefined),
    describe("EXCAVATA", "Excavata", Microbes, "Excavata", "Excavata", Undefined),
    describe("AMOEBAE", "Amoebae", Microbes, "Amoebae", "Amoebozoa", Iczn),
    describe("CENTROHELIDA", "Centrohelida", Microbes, "Centrohelida", "Centrohelida", Iczn),
    describe("HAPTOPHYTA", "Haptophyta", Microbes, "Haptophyta", "Haptophyta", Undefined),
    describe("APUSOZOA", "Apusozoa", Microbes, "Apusozoa", "Apusozoa", Iczn),
    describe("DIATOMS", "Diatoms", Microbes, "Diatoms", "Bacillariophyta", Icn),
    describe("CILIATES", "Ciliates", Microbes, "Ciliates", "Ciliophora", Undefined),
    describe("FORAMS", "Forams", Microbes, "Forams", "Foraminifera", Iczn),
    // Animals
    describe("METAZOA", "Animals", Animals, "Animals", "Metazoa", Iczn),
    describe("BIRDS", "Birds", Animals, "Birds", "Aves", Iczn),
    describe("TETRAPODS", "Tetrapods", Animals, "Tetrapods", "Tetrapoda", Iczn),
    describe("MAMMALS", "Mammals", Animals, "Mammals", "Mammalia", Iczn),
    describe("AMPHIBIANS", "Amphibians", Animals, "Amphibians", "Amphibia", Iczn),
    describe("VERTEBRATES", "Vertebrates", Animals, "Vertebrates", "Vertebrata", Iczn),
    describe("ARTHROPODS", "Arthropods", Animals, "Arthropods", "Arthropoda", Iczn),
    describe("MOLLUSCS", "Molluscs", Animals, "Molluscs", "Mollusca", Iczn),
    describe("PLATYHELMINTHES", "Platyhelminthes", Animals, "Platyhelminthes", "Platyhelminthes", Iczn),
    describe("ANNELIDS", "Annelids", Animals, "Annelids", "Annelida", Iczn),
    describe("CNIDARIA", "Cnidarians", Animals, "Cnidarians", "Cnidaria", Iczn),
    describe("ARACHNIDES", "Arachnides", Animals, "Arachnids", "Arachnida", Iczn),
    describe("INSECTS", "Insects", Animals, "Insects", "Insecta", Iczn),
    // Fungi
    describe("FUNGI", "Fungi", Fungi, "Fungi", "Fungi", Icn),
    // Plants
    describe("LAND_PLANTS", "Land plants", Plants, "Plants", "Embryophyta", Icn),
    describe("HORNWORTS", "Hornworts", Plants, "Anthocerotophyta", "Anthocerotophyta", Icn),
    describe("MOSSES", "Mosses", Plants, "Bryophyta", "Bryophyta", Icn),
    describe("LIVERWORTS", "Liverworts", Plants, "Marchantiophyta", "Marchantiophyta", Icn),
    describe("VASCULAR_PLANTS", "Vascular plants", Plants, "Tracheophyta", "Tracheophyta", Icn),
    describe("LYCOPHYTES", "Club mosses", Plants, "Lycopodiophyta", "Lycopodiophyta", Icn),
    describe("FERNS", "Ferns", Plants, "Moniliformopses", "Moniliformopses", Icn),
    describe("SEED_PLANTS", "Seed plants", Plants, "Spermatophyta", "Spermatophyta", Icn),
    describe("FLOWERING_PLANTS", "Flowering plants", Plants, "Magnoliophyta", "Magnoliophyta", Icn),
    describe("MONOCOTS", "Monocots", Plants, "Monocots", "Liliopsida", Icn),
    describe("EUDICOTS", "Eudicots", Plants, "Eudicots", "eudicotyledons", Icn),
    describe("ASTERIDS", "Asterids", Plants, "Asterids", "asterids", Icn),
    describe("ROSIDS", "Rosids", Plants, "Rosids", "rosids", Icn),
];

/// Find the static description for a context tag
pub fn describe_tag(tag: &str) -> Option<&'static ContextDescription> {
    CONTEXT_DESCRIPTIONS.iter().find(|d| d.tag == tag)
}

/// A context bound to a root taxon of a loaded taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxonomyContext {
    pub tag: &'static str,
    pub label: &'static str,
    pub group: ContextGroup,
    pub index_suffix: &'static str,
    pub root: TaxonId,
    pub code: NomenclaturalCode,
}

impl TaxonomyContext {
    fn bind(description: &ContextDescription, root: TaxonId) -> Self {
        Self {
            tag: description.tag,
            label: description.label,
            group: description.group,
            index_suffix: description.index_suffix,
            root,
            code: description.code,
        }
    }

    /// True for the unscoped, all-taxa context
    pub fn is_all_taxa(&self) -> bool {
        self.tag == ALL_TAXA_TAG
    }
}

/// Read-only table of the contexts available for a taxonomy
#[derive(Debug, Clone)]
pub struct ContextRegistry {
    /// Bound contexts; index 0 is always the all-taxa context
    contexts: Vec<TaxonomyContext>,
}

impl ContextRegistry {
    /// Bind every context description whose root name can be resolved.
    ///
    /// `taxonomy_root` becomes the root of the all-taxa context; `resolve_root`
    /// maps a description's root name to a taxon id. Descriptions whose root
    /// cannot be resolved are left out.
    pub fn build<F>(taxonomy_root: TaxonId, mut resolve_root: F) -> Self
    where
        F: FnMut(&str) -> Option<TaxonId>,
    {
        let mut contexts = Vec::with_capacity(CONTEXT_DESCRIPTIONS.len());
        for description in CONTEXT_DESCRIPTIONS {
            if description.tag == ALL_TAXA_TAG {
                contexts.insert(0, TaxonomyContext::bind(description, taxonomy_root));
                continue;
            }
            match resolve_root(description.root_name) {
                Some(root) => contexts.push(TaxonomyContext::bind(description, root)),
                None => tracing::debug!(
                    "Context {} not available: root taxon '{}' not in taxonomy",
                    description.tag,
                    description.root_name
                ),
            }
        }
        Self { contexts }
    }

    /// The unscoped context covering the whole taxonomy
    pub fn root(&self) -> &TaxonomyContext {
        &self.contexts[0]
    }

    /// Look up a context by tag
    pub fn get(&self, tag: &str) -> Option<&TaxonomyContext> {
        self.contexts.iter().find(|c| c.tag == tag)
    }

    /// Look up a context by tag, falling back to the all-taxa context
    pub fn by_tag(&self, tag: &str) -> &TaxonomyContext {
        self.get(tag).unwrap_or_else(|| {
            tracing::warn!("Unknown context tag '{tag}', using {ALL_TAXA_TAG}");
            self.root()
        })
    }

    /// Look up a context by tag or label, case-insensitively
    pub fn find(&self, name: &str) -> Option<&TaxonomyContext> {
        let name = name.trim();
        self.contexts
            .iter()
            .find(|c| c.tag.eq_ignore_ascii_case(name) || c.label.eq_ignore_ascii_case(name))
    }

    /// Contexts belonging to a group, in table order
    pub fn in_group(&self, group: ContextGroup) -> impl Iterator<Item = &TaxonomyContext> {
        self.contexts.iter().filter(move |c| c.group == group)
    }

    /// Contexts keyed by group, each list in table order
    pub fn grouped(&self) -> BTreeMap<ContextGroup, Vec<&TaxonomyContext>> {
        let mut groups: BTreeMap<ContextGroup, Vec<&TaxonomyContext>> = BTreeMap::new();
        for context in &self.contexts {
            groups.entry(context.group).or_default().push(context);
        }
        groups
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaxonomyContext> {
        self.contexts.iter()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
