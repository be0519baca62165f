//! blockpath CLI: breadcrumbs and word counts for the blocks you are editing.
//!
//! Talks to the host editor's local HTTP API, or works offline on a JSON
//! dump of a page tree.

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
