pub mod build;
pub mod completions;
pub mod font;
pub mod ids;
pub mod image;

use clap::{Parser, Subcommand};

/// particraft - asset conversion for Particule projects
#[derive(Parser, Debug)]
#[command(name = "particraft")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log debug events (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export every asset of a resolved project configuration
    Build(build::BuildArgs),

    /// Encode one image to a binary image record
    Image(image::ImageArgs),

    /// Rasterize a font to a binary bitmap font
    Font(font::FontArgs),

    /// Print an identity tree
    Ids(ids::IdsArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_build_with_distribution() {
        let cli = Cli::parse_from(["particraft", "-v", "build", "project.json", "--distribution", "desktop"]);
        assert!(cli.verbose);
        let Commands::Build(args) = cli.command else {
            panic!("expected build");
        };
        assert_eq!(args.config.to_str(), Some("project.json"));
        assert_eq!(args.distribution.as_deref(), Some("desktop"));
    }
}
