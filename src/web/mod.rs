//! JSON web service for name resolution.
//!
//! The service loads one taxonomy at startup and answers read-only queries
//! against it. Resolution runs on the blocking thread pool.
//!
//! ## Starting the Server
//!
//! ```text
//! # Start on default port 8080 with the embedded demo taxonomy
//! tnrs-solver serve
//!
//! # Custom port, a full taxonomy, and auto-open browser
//! tnrs-solver serve --port 3000 --taxonomy ott.json.gz --open
//!
//! # Bind to all interfaces
//! tnrs-solver serve --address 0.0.0.0
//! ```
//!
//! ## API Endpoints
//!
//! - `POST /v2/tnrs/match_names` - Resolve a batch of names
//! - `POST /v2/tnrs/infer_context` - Infer the least inclusive context of a batch of names
//! - `POST /v2/tnrs/contexts` - List context labels by group
//! - `POST /v2/taxonomy/taxon` - Describe a taxon, optionally with lineage and children
//! - `POST /v2/taxonomy/lica` - Least inclusive common ancestor of a set of taxa
//! - `GET /v2/taxonomy/about` - Taxonomy metadata
//!
//! Invalid requests get `400`, unknown taxa `404` and backing store failures
//! `500`, each with an [`server::ErrorResponse`] body.

pub mod server;
