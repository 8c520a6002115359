use clap::Args;

use crate::cli::{NameArgs, OutputFormat, TaxonomyArgs};
use crate::matching::engine::{MatchingConfig, MatchingEngine};
use crate::taxonomy::{TaxonGraphView, TaxonNameIndex};
use crate::utils::validation::normalize_names;

#[derive(Args)]
pub struct InferContextArgs {
    #[command(flatten)]
    pub names: NameArgs,

    /// Ignore taxa flagged as dubious
    #[arg(long)]
    pub exclude_dubious: bool,

    #[command(flatten)]
    pub taxonomy: TaxonomyArgs,
}

/// Execute infer-context subcommand
///
/// # Errors
///
/// Returns an error if the taxonomy or names cannot be loaded.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: InferContextArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let names = normalize_names(&args.names.collect()?)?;
    if names.is_empty() {
        anyhow::bail!("No names given. Pass names as arguments, with --names-file, or '-' for stdin");
    }

    let taxonomy = args.taxonomy.load(verbose)?;
    let index = TaxonNameIndex::build(&taxonomy);
    let contexts = taxonomy.context_registry();
    let config = MatchingConfig {
        include_dubious: !args.exclude_dubious,
        ..MatchingConfig::default()
    };
    let engine = MatchingEngine::with_config(&taxonomy, &index, &contexts, config);

    let inference = engine.infer_context(&names)?;
    let lica = taxonomy.taxon(inference.lica)?;
    let ambiguous: Vec<&str> = inference.ambiguous_names.iter().map(String::as_str).collect();
    let unmatched: Vec<&str> = inference.unmatched_names().collect();

    match format {
        OutputFormat::Text => {
            println!(
                "Context: {} ({})",
                inference.context.label, inference.context.tag
            );
            println!("LICA: {} [{}]", lica.name, lica.id);
            println!(
                "Matched exactly: {} of {} names",
                inference.exact_matches.len(),
                names.len()
            );
            if !ambiguous.is_empty() {
                println!("Ambiguous: {}", ambiguous.join(", "));
            }
            if !unmatched.is_empty() {
                println!("Unmatched: {}", unmatched.join(", "));
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "context_name": inference.context.label,
                "context_tag": inference.context.tag,
                "context_ott_id": inference.context.root,
                "lica": lica,
                "exact_matches": inference.exact_matches.iter()
                    .map(|(name, id)| serde_json::json!({"name": name, "ott_id": id}))
                    .collect::<Vec<_>>(),
                "ambiguous_names": ambiguous,
                "unmatched_names": unmatched,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("context_tag\tcontext_name\tlica_id\tlica_name\tambiguous\tunmatched");
            println!(
                "{}\t{}\t{}\t{}\t{}\t{}",
                inference.context.tag,
                inference.context.label,
                lica.id,
                lica.name,
                ambiguous.join(","),
                unmatched.join(",")
            );
        }
    }

    Ok(())
}
