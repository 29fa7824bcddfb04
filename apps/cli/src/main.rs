//! Blueprint annotator CLI.
//!
//! Reads the blueprint document section by section, asks the generation
//! service for explanations and hypotheses, and audits generated text.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
