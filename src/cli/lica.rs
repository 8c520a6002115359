use clap::Args;

use crate::cli::{OutputFormat, TaxonomyArgs};
use crate::core::types::TaxonId;
use crate::matching::engine::MatchingEngine;
use crate::taxonomy::TaxonNameIndex;
use crate::utils::validation::validate_lica_ids;

#[derive(Args)]
pub struct LicaArgs {
    /// Taxon ids (e.g. 1234 or ott1234)
    #[arg(required = true)]
    pub ids: Vec<TaxonId>,

    #[command(flatten)]
    pub taxonomy: TaxonomyArgs,
}

/// Execute lica subcommand
///
/// # Errors
///
/// Returns an error if the taxonomy cannot be loaded or none of the ids are known.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: LicaArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    validate_lica_ids(&args.ids)?;

    let taxonomy = args.taxonomy.load(verbose)?;
    let index = TaxonNameIndex::build(&taxonomy);
    let contexts = taxonomy.context_registry();
    let engine = MatchingEngine::new(&taxonomy, &index, &contexts);

    let result = engine.lica(&args.ids)?;
    if !result.ids_not_found.is_empty() {
        let missing: Vec<String> = result.ids_not_found.iter().map(ToString::to_string).collect();
        eprintln!("Warning: unknown taxon ids: {}", missing.join(", "));
    }
    let Some(lica) = &result.lica else {
        anyhow::bail!("None of the given taxon ids are in the taxonomy");
    };

    match format {
        OutputFormat::Text => {
            println!("{} [{}] {}", lica.name, lica.id, lica.rank);
            if verbose {
                println!("From {} taxa", result.ids_used.len());
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Tsv => {
            println!("lica_id\tlica_name\trank\tids_used\tids_not_found");
            let join = |ids: &[TaxonId]| {
                ids.iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",")
            };
            println!(
                "{}\t{}\t{}\t{}\t{}",
                lica.id,
                lica.name,
                lica.rank,
                join(&result.ids_used),
                join(&result.ids_not_found)
            );
        }
    }

    Ok(())
}
