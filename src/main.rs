mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use commands::{run_evaluate, run_generate, run_resolve};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => {
            run_generate(args)?;
        }
        Commands::Resolve(args) => {
            run_resolve(args)?;
        }
        Commands::Evaluate(args) => {
            run_evaluate(args)?;
        }
    }

    Ok(())
}
