use clap::Args;

use crate::cli::{NameArgs, OutputFormat, TaxonomyArgs};
use crate::matching::engine::{MatchingConfig, MatchingEngine};
use crate::matching::results::{TnrsHit, TnrsResults};
use crate::matching::scoring::DEFAULT_MIN_SCORE;
use crate::taxonomy::TaxonNameIndex;
use crate::utils::validation::{check_approximate_limit, normalize_names};

#[derive(Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub names: NameArgs,

    /// Context to match in, by tag or label (e.g. "Birds", "LAND_PLANTS");
    /// inferred from the names by default
    #[arg(short, long)]
    pub context: Option<String>,

    /// Minimum score for approximate matches (0.0-1.0)
    #[arg(long, default_value_t = DEFAULT_MIN_SCORE)]
    pub min_score: f64,

    /// Only report exact matches
    #[arg(long)]
    pub no_approximate: bool,

    /// Leave out taxa flagged as dubious
    #[arg(long)]
    pub exclude_dubious: bool,

    #[command(flatten)]
    pub taxonomy: TaxonomyArgs,
}

/// Execute resolve subcommand
///
/// # Errors
///
/// Returns an error if the taxonomy or names cannot be loaded, the input
/// exceeds the query limits, or the context is unknown.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ResolveArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    if !(0.0..=1.0).contains(&args.min_score) {
        anyhow::bail!("--min-score must be between 0 and 1, got {}", args.min_score);
    }

    let names = normalize_names(&args.names.collect()?)?;
    if names.is_empty() {
        anyhow::bail!("No names given. Pass names as arguments, with --names-file, or '-' for stdin");
    }
    if !args.no_approximate {
        check_approximate_limit(names.len())?;
    }

    let taxonomy = args.taxonomy.load(verbose)?;
    let index = TaxonNameIndex::build(&taxonomy);
    let contexts = taxonomy.context_registry();

    let config = MatchingConfig {
        min_score: args.min_score,
        do_approximate_matching: !args.no_approximate,
        include_dubious: !args.exclude_dubious,
        ..MatchingConfig::default()
    };
    let engine = MatchingEngine::with_config(&taxonomy, &index, &contexts, config);

    let context = args
        .context
        .as_deref()
        .map(|name| engine.context(name))
        .transpose()?;

    if verbose {
        match context {
            Some(c) => eprintln!("Matching {} names in context {}", names.len(), c.label),
            None => eprintln!("Matching {} names, inferring context", names.len()),
        }
    }

    let results = engine.resolve(&names, context)?;

    match format {
        OutputFormat::Text => print_text_results(&names, &results, verbose),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Tsv => print_tsv_results(&names, &results),
    }

    Ok(())
}

fn match_kind(hit: &TnrsHit) -> &'static str {
    if hit.is_approximate {
        "approximate"
    } else if hit.is_homonym {
        "homonym"
    } else if hit.is_synonym {
        "synonym"
    } else {
        "exact"
    }
}

fn print_text_results(names: &[String], results: &TnrsResults, verbose: bool) {
    if let Some(context) = results.context() {
        println!("Context: {} ({})", context.label, context.tag);
    }
    if verbose {
        if let Some(lica) = results.lica() {
            println!("LICA: {lica}");
        }
    }

    for name in names {
        let display = if name.is_empty() { "<blank>" } else { name };
        println!("\n{display}");
        match results.get(name) {
            Some(result) => {
                for hit in result.matches.iter() {
                    println!(
                        "   {} [{}] {} - {} (score {:.3})",
                        hit.taxon.name,
                        hit.taxon.id,
                        hit.taxon.rank,
                        match_kind(hit),
                        hit.score
                    );
                }
                if result.matches.len() > 1 && result.matches.iter().all(|h| h.is_homonym) {
                    println!("   Ambiguous: {} taxa share this name", result.matches.len());
                }
            }
            None => println!("   No match"),
        }
    }

    println!(
        "\n{} direct, {} approximate, {} unmatched",
        results.names_with_direct_matches().len(),
        results.names_with_approximate_matches().len(),
        results.unmatched_names().len()
    );
}

fn print_tsv_results(names: &[String], results: &TnrsResults) {
    println!("name\tmatch_type\ttaxon_id\ttaxon_name\trank\tscore\tnomenclature_code\tcontext");
    let context = results.context().map_or("", |c| c.tag);
    for name in names {
        match results.get(name) {
            Some(result) => {
                for hit in result.matches.iter() {
                    println!(
                        "{}\t{}\t{}\t{}\t{}\t{:.4}\t{}\t{}",
                        name,
                        match_kind(hit),
                        hit.taxon.id,
                        hit.taxon.name,
                        hit.taxon.rank,
                        hit.score,
                        hit.nomenclature_code
                            .map_or_else(|| "unknown".to_string(), |c| c.to_string()),
                        context
                    );
                }
            }
            None => println!("{name}\tunmatched\t\t\t\t\t\t{context}"),
        }
    }
}
