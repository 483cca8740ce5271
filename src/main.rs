use clap::Parser;
use miette::Result;
use particraft::cli::{Cli, Commands};
use particraft::output::Printer;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let printer = Printer::new();

    match cli.command {
        Commands::Build(args) => particraft::cli::build::run(args, &printer)?,
        Commands::Image(args) => particraft::cli::image::run(args, &printer)?,
        Commands::Font(args) => particraft::cli::font::run(args, &printer)?,
        Commands::Ids(args) => particraft::cli::ids::run(args, &printer)?,
        Commands::Completions(args) => particraft::cli::completions::run(args)?,
    }

    Ok(())
}
