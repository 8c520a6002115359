use clap::Args;

use crate::cli::{OutputFormat, TaxonomyArgs};
use crate::core::types::TaxonId;

#[derive(Args)]
pub struct TaxonArgs {
    /// Taxon id (e.g. 1234 or ott1234)
    #[arg(required = true)]
    pub id: TaxonId,

    /// Include the path to the root
    #[arg(long)]
    pub lineage: bool,

    /// Include direct children
    #[arg(long)]
    pub children: bool,

    #[command(flatten)]
    pub taxonomy: TaxonomyArgs,
}

/// Execute taxon subcommand
///
/// # Errors
///
/// Returns an error if the taxonomy cannot be loaded or the taxon is unknown.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: TaxonArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let taxonomy = args.taxonomy.load(verbose)?;
    let report = taxonomy.report(args.id, args.lineage, args.children)?;
    let taxon = &report.taxon;

    match format {
        OutputFormat::Text => {
            println!("{} [{}]", taxon.name, taxon.id);
            println!("   Rank: {}", taxon.rank);
            println!("   Code: {}", taxon.code);
            if let Some(context) = &taxon.least_context {
                println!("   Context: {context}");
            }
            if !taxon.synonyms.is_empty() {
                println!("   Synonyms: {}", taxon.synonyms.join(", "));
            }
            if taxon.deprecated {
                println!("   Deprecated");
            }
            if taxon.dubious {
                println!("   Dubious");
            }
            if let Some(lineage) = &report.lineage {
                let path: Vec<&str> = lineage.iter().map(|t| t.name.as_str()).collect();
                println!("   Lineage: {}", path.join(" < "));
            }
            if let Some(children) = &report.children {
                println!("   Children ({}):", children.len());
                for child in children {
                    println!("     {} [{}] {}", child.name, child.id, child.rank);
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Tsv => {
            println!("id\tname\trank\tcode\tparent\tdepth\tcontext\tsynonyms");
            println!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                taxon.id,
                taxon.name,
                taxon.rank,
                taxon.code,
                taxon.parent.map(|p| p.to_string()).unwrap_or_default(),
                report.depth,
                taxon.least_context.as_deref().unwrap_or(""),
                taxon.synonyms.join(",")
            );
        }
    }

    Ok(())
}
