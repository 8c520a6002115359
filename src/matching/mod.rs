//! Name matching, disambiguation and scoring.
//!
//! - [`MatchingEngine`]: main entry point; resolves batches of names
//! - [`compute_mrca`] / [`TaxonSet`]: least inclusive common ancestors
//! - [`infer_context`]: narrows a batch to the smallest context covering it
//! - [`FuzzyScore`]: scores for approximate matches
//! - [`TnrsResults`]: per-name hits plus the matched/unmatched partition
//!
//! ## Pipeline
//!
//! 1. **Context inference**: names with exactly one exact hit anywhere in the
//!    taxonomy fix a LICA; its least inclusive context scopes the rest
//! 2. **Exact matching**: remaining names are looked up within the context;
//!    several hits are reported as homonyms, never auto-selected
//! 3. **Approximate matching**: names still without hits go through a fuzzy
//!    lookup; hits outside the LICA are down-weighted by `1 / ln(distance)`
//!
//! ## Example
//!
//! ```rust,no_run
//! use tnrs_solver::matching::MatchingEngine;
//! use tnrs_solver::taxonomy::{Taxonomy, TaxonNameIndex};
//!
//! let taxonomy = Taxonomy::load_embedded().unwrap();
//! let index = TaxonNameIndex::build(&taxonomy);
//! let contexts = taxonomy.context_registry();
//!
//! let engine = MatchingEngine::new(&taxonomy, &index, &contexts);
//! let results = engine.resolve(&["Quercus robur", "Qercus"], None).unwrap();
//!
//! for result in results.iter() {
//!     for hit in result.matches.iter() {
//!         println!("{} -> {} ({:.2})", result.name, hit.taxon.name, hit.score);
//!     }
//! }
//! ```

pub mod context_inference;
pub mod engine;
pub mod mrca;
pub mod results;
pub mod scoring;

pub use context_inference::{infer_context, ContextInference};
pub use engine::{LicaResult, MatchingConfig, MatchingEngine, TnrsError};
pub use mrca::{compute_mrca, TaxonSet};
pub use results::{TnrsHit, TnrsMatchSet, TnrsNameResult, TnrsResults};
pub use scoring::FuzzyScore;
