//! CiteLens CLI — citation intelligence for AI answer engines.
//!
//! Probes answer engines with brand-relevant questions, detects citations,
//! scores content citability, and tracks the competitive citation graph.

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
