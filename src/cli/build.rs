//! Build command: run the export pipeline for a project.

use std::path::PathBuf;

use clap::Args;

use crate::context::{BuildContext, BuildOutcome};
use crate::distribution::Capabilities;
use crate::error::Result;
use crate::output::{display_path, plural, Printer};

/// Export every asset of a resolved project configuration
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Resolved configuration (JSON or YAML)
    pub config: PathBuf,

    /// Target distribution (default: the configured one, else casio-cg)
    #[arg(long, short)]
    pub distribution: Option<String>,

    /// Remove previous build output first
    #[arg(long)]
    pub clean: bool,
}

pub fn run(args: BuildArgs, printer: &Printer) -> Result<()> {
    let mut ctx = BuildContext::load(&args.config)?;
    if args.clean {
        ctx.config.clean = true;
    }

    let caps = Capabilities::builtin();
    let outcome = ctx.build(&caps, args.distribution.as_deref())?;
    report(&outcome, &ctx, printer);
    Ok(())
}

fn report(outcome: &BuildOutcome, ctx: &BuildContext, printer: &Printer) {
    printer.status(
        "Exported",
        &format!(
            "{} ({})",
            plural(outcome.report.exported, "asset", "assets"),
            outcome.distribution
        ),
    );

    for diagnostic in outcome.report.diagnostics.iter() {
        printer.diagnostic(diagnostic);
    }

    let stats = outcome.report.stats;
    let detail = printer.dim(&format!("{} unchanged", stats.unchanged));
    printer.status(
        "Finished",
        &format!(
            "{} to {} {}",
            plural(stats.written, "file written", "files written"),
            printer.cyan(&display_path(&ctx.build_dir)),
            detail
        ),
    );
}
