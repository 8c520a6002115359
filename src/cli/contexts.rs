use clap::Args;

use crate::cli::{OutputFormat, TaxonomyArgs};
use crate::core::types::ContextGroup;
use crate::taxonomy::TaxonGraphView;

#[derive(Args)]
pub struct ContextsArgs {
    /// Only list contexts in this group
    #[arg(long, value_enum)]
    pub group: Option<GroupArg>,

    #[command(flatten)]
    pub taxonomy: TaxonomyArgs,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum GroupArg {
    Life,
    Microbes,
    Animals,
    Fungi,
    Plants,
}

impl From<GroupArg> for ContextGroup {
    fn from(arg: GroupArg) -> Self {
        match arg {
            GroupArg::Life => ContextGroup::Life,
            GroupArg::Microbes => ContextGroup::Microbes,
            GroupArg::Animals => ContextGroup::Animals,
            GroupArg::Fungi => ContextGroup::Fungi,
            GroupArg::Plants => ContextGroup::Plants,
        }
    }
}

/// Execute contexts subcommand
///
/// # Errors
///
/// Returns an error if the taxonomy cannot be loaded.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ContextsArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let taxonomy = args.taxonomy.load(verbose)?;
    let registry = taxonomy.context_registry();
    let filter: Option<ContextGroup> = args.group.map(Into::into);

    let mut groups = registry.grouped();
    if let Some(group) = filter {
        groups.retain(|g, _| *g == group);
    }

    match format {
        OutputFormat::Text => {
            for (group, contexts) in &groups {
                println!("{group}");
                for context in contexts {
                    let root = taxonomy.taxon(context.root)?;
                    println!(
                        "   {:<18} {:<20} root: {} [{}], code: {}",
                        context.tag, context.label, root.name, root.id, context.code
                    );
                }
            }
        }
        OutputFormat::Json => {
            let output: serde_json::Map<String, serde_json::Value> = groups
                .iter()
                .map(|(group, contexts)| {
                    let labels: Vec<&str> = contexts.iter().map(|c| c.label).collect();
                    (group.to_string(), serde_json::json!(labels))
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("group\ttag\tlabel\troot_id\tcode");
            for (group, contexts) in &groups {
                for context in contexts {
                    println!(
                        "{}\t{}\t{}\t{}\t{}",
                        group, context.tag, context.label, context.root, context.code
                    );
                }
            }
        }
    }

    Ok(())
}
