use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod core;
mod matching;
mod taxonomy;
mod utils;
mod web;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("tnrs_solver=debug,info")
    } else {
        EnvFilter::new("tnrs_solver=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        cli::Commands::Resolve(args) => {
            cli::resolve::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::InferContext(args) => {
            cli::infer_context::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Contexts(args) => {
            cli::contexts::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Lica(args) => {
            cli::lica::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Taxon(args) => {
            cli::taxon::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Serve(args) => {
            web::server::run(args)?;
        }
    }

    Ok(())
}
