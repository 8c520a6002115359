//! Command-line interface for tnrs-solver.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **resolve**: Resolve names against the taxonomy (exact, homonym and fuzzy matching)
//! - **infer-context**: Report the narrowest taxonomic context covering a set of names
//! - **contexts**: List the taxonomic contexts available for the taxonomy
//! - **lica**: Least inclusive common ancestor of a set of taxon ids
//! - **taxon**: Show a taxon with its lineage and children
//! - **serve**: Start the JSON web service
//!
//! ## Usage
//!
//! ```text
//! # Resolve a few names, inferring the context
//! tnrs-solver resolve "Quercus robur" "Qercus alba"
//!
//! # Names from a file or stdin, one per line
//! tnrs-solver resolve --names-file names.txt --format tsv
//! cat names.txt | tnrs-solver resolve -
//!
//! # Restrict matching to a context
//! tnrs-solver resolve Morus --context Birds
//!
//! # Use a full taxonomy instead of the embedded demo
//! tnrs-solver resolve Morus --taxonomy ott.json.gz
//!
//! # Start the web service
//! tnrs-solver serve --port 7474
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::taxonomy::Taxonomy;
use crate::utils::validation::parse_name_lines;

pub mod contexts;
pub mod infer_context;
pub mod lica;
pub mod resolve;
pub mod taxon;

#[derive(Parser)]
#[command(name = "tnrs-solver")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Resolve taxonomic names against a reference taxonomy")]
#[command(
    long_about = "tnrs-solver matches free-text taxonomic names against a taxonomy.\n\nIt infers the narrowest taxonomic context covering a batch of names and provides:\n- Exact matches on canonical names and synonyms\n- Homonyms reported side by side rather than guessed\n- Fuzzy matches for misspellings, down-weighted outside the inferred context"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve taxonomic names
    Resolve(resolve::ResolveArgs),

    /// Infer the taxonomic context of a set of names
    InferContext(infer_context::InferContextArgs),

    /// List available taxonomic contexts
    Contexts(contexts::ContextsArgs),

    /// Find the least inclusive common ancestor of taxa
    Lica(lica::LicaArgs),

    /// Show a taxon
    Taxon(taxon::TaxonArgs),

    /// Start the web server
    Serve(ServeArgs),
}

#[derive(clap::Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1")]
    pub address: String,

    /// Open browser automatically
    #[arg(long)]
    pub open: bool,

    #[command(flatten)]
    pub taxonomy: TaxonomyArgs,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// Taxonomy selection shared by all commands
#[derive(clap::Args, Clone, Debug, Default)]
pub struct TaxonomyArgs {
    /// Path to a taxonomy JSON file (.json or .json.gz); defaults to the embedded demo taxonomy
    #[arg(long)]
    pub taxonomy: Option<PathBuf>,
}

impl TaxonomyArgs {
    /// Load the selected taxonomy
    ///
    /// # Errors
    ///
    /// Returns an error if the taxonomy cannot be read or fails validation.
    pub fn load(&self, verbose: bool) -> anyhow::Result<Taxonomy> {
        let taxonomy = if let Some(path) = &self.taxonomy {
            Taxonomy::load_from_file(path)?
        } else {
            Taxonomy::load_embedded()?
        };

        if verbose {
            eprintln!(
                "Loaded taxonomy '{}' with {} taxa",
                taxonomy.name,
                taxonomy.len()
            );
        }
        Ok(taxonomy)
    }
}

/// Name sources shared by the name-based commands
#[derive(clap::Args, Clone, Debug, Default)]
pub struct NameArgs {
    /// Names to process. Use '-' to read names from stdin, one per line
    pub names: Vec<String>,

    /// File with one name per line ('#' starts a comment line)
    #[arg(long)]
    pub names_file: Option<PathBuf>,
}

impl NameArgs {
    /// Collect names from the command line, `--names-file` and stdin
    ///
    /// # Errors
    ///
    /// Returns an error if the names file or stdin cannot be read.
    pub fn collect(&self) -> anyhow::Result<Vec<String>> {
        let mut names = Vec::new();
        for name in &self.names {
            if name == "-" {
                let mut text = String::new();
                std::io::stdin().read_to_string(&mut text)?;
                names.extend(parse_name_lines(&text));
            } else {
                names.push(name.clone());
            }
        }
        if let Some(path) = &self.names_file {
            names.extend(read_names_file(path)?);
        }
        Ok(names)
    }
}

fn read_names_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read names file {}: {e}", path.display()))?;
    Ok(parse_name_lines(&text))
}
