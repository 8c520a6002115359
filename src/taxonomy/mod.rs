//! Taxonomy storage, hierarchy access and name indexing.
//!
//! The matching engine talks to the taxonomy only through two traits:
//!
//! - [`TaxonGraphView`]: parent links, synonyms, descendant checks and
//!   hierarchical distances
//! - [`NameIndex`]: exact (homonym-aware) and fuzzy name lookups scoped by context
//!
//! [`Taxonomy`] and [`TaxonNameIndex`] are the in-memory implementations. A demo
//! taxonomy is compiled into the binary; full taxonomies are loaded from JSON
//! (optionally gzip-compressed).
//!
//! ## Example
//!
//! ```rust,no_run
//! use tnrs_solver::taxonomy::{Taxonomy, TaxonNameIndex, NameIndex};
//!
//! let taxonomy = Taxonomy::load_embedded().unwrap();
//! let contexts = taxonomy.context_registry();
//! let index = TaxonNameIndex::build(&taxonomy);
//!
//! let hits = index.exact_lookup(contexts.root(), "Quercus").unwrap();
//! println!("{} taxa named Quercus", hits.len());
//! ```

pub mod graph;
pub mod index;
pub mod store;

pub use graph::{ancestry_path, StoreError, TaxonGraphView};
pub use index::{escape_query, NameIndex, TaxonNameIndex};
pub use store::{Taxonomy, TaxonomyError};
