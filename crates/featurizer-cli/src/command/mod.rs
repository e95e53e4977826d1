use clap::{Parser, Subcommand};

use self::{fit::FitArg, transform::TransformArg};

mod fit;
mod transform;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Log pipeline internals at debug level (`RUST_LOG` takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Train a featurizer and save its transformer
    Fit(#[clap(flatten)] FitArg),
    /// Apply a saved transformer to new data
    Transform(#[clap(flatten)] TransformArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    crate::util::init_tracing(args.verbose);
    match &args.mode {
        Mode::Fit(arg) => fit::run(arg)?,
        Mode::Transform(arg) => transform::run(arg)?,
    }
    Ok(())
}
