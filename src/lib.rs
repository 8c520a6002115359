//! # tnrs-solver
//!
//! A library for resolving taxonomic names against a versioned taxonomy.
//!
//! Lists of names from papers, field notes or specimen databases are full of
//! misspellings, outdated synonyms and homonyms (the genus *Morus* is both a
//! gannet and a mulberry). `tnrs-solver` maps each name to the taxa it can
//! refer to, using the batch as a whole to decide which part of the tree of
//! life the names come from.
//!
//! ## Features
//!
//! - **Context inference**: Unambiguous names locate the batch's least
//!   inclusive common ancestor, which scopes every other lookup
//! - **Homonym-aware exact matching**: Canonical names and synonyms, flagged per hit
//! - **Fuzzy matching**: Edit-distance scoring with a penalty for candidates far
//!   from the inferred ancestor in the hierarchy
//! - **LICA queries**: Least inclusive common ancestor of arbitrary taxon sets
//!
//! ## Example
//!
//! ```rust,no_run
//! use tnrs_solver::{MatchingEngine, Taxonomy, TaxonNameIndex};
//!
//! let taxonomy = Taxonomy::load_embedded().unwrap();
//! let index = TaxonNameIndex::build(&taxonomy);
//! let contexts = taxonomy.context_registry();
//!
//! let engine = MatchingEngine::new(&taxonomy, &index, &contexts);
//! let results = engine.resolve(&["Morus alba", "Quercus robur", "Rosa"], None).unwrap();
//!
//! for result in results.iter() {
//!     for hit in result.matches.iter() {
//!         println!("{} -> {} [{}] {:.2}", result.name, hit.taxon.name, hit.taxon.id, hit.score);
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Taxa, identifiers and taxonomic contexts
//! - [`taxonomy`]: Taxonomy storage, hierarchy access and name indexing
//! - [`matching`]: Context inference, exact and fuzzy matching, LICA computation
//! - [`utils`]: Input validation
//! - [`cli`]: Command-line interface implementation
//! - [`web`]: JSON web service

pub mod cli;
pub mod core;
pub mod matching;
pub mod taxonomy;
pub mod utils;
pub mod web;

// Re-export commonly used types for convenience
pub use core::context::{ContextRegistry, TaxonomyContext};
pub use core::taxon::Taxon;
pub use core::types::*;
pub use matching::engine::{MatchingConfig, MatchingEngine, TnrsError};
pub use matching::results::{TnrsHit, TnrsMatchSet, TnrsResults};
pub use taxonomy::{NameIndex, StoreError, TaxonGraphView, TaxonNameIndex, Taxonomy};
