//! Core data types for taxonomic name resolution.
//!
//! This module provides the fundamental types used throughout the library:
//!
//! - [`Taxon`]: A named node of the taxonomy with rank, code, synonyms and flags
//! - [`TaxonomyContext`], [`ContextRegistry`]: Named clades that scope name lookups
//! - [`TaxonId`], [`NomenclaturalCode`], [`ContextGroup`]: Identifier and metadata types
//!
//! ## Contexts
//!
//! Contexts nest: a taxon inside the rosids is also inside the eudicots, the
//! flowering plants and so on up to "All life". Each taxon records the tag of the
//! *least inclusive* context containing it.
//!
//! | Tag | Root taxon | Code |
//! |-----|------------|------|
//! | ALLTAXA | (taxonomy root) | undefined |
//! | METAZOA | Metazoa | ICZN |
//! | LAND_PLANTS | Embryophyta | ICN |
//! | BACTERIA | Bacteria | ICNP |
//!
//! [`Taxon`]: taxon::Taxon
//! [`TaxonomyContext`]: context::TaxonomyContext
//! [`ContextRegistry`]: context::ContextRegistry
//! [`TaxonId`]: types::TaxonId
//! [`NomenclaturalCode`]: types::NomenclaturalCode
//! [`ContextGroup`]: types::ContextGroup

pub mod context;
pub mod taxon;
pub mod types;
