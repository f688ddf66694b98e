//! pubsync CLI: keep hand-authored publication pages in sync with a
//! researcher's scholarly profile.
//!
//! Fetches the publication listing, ranks it newest first and rewrites the
//! publication lists of the configured HTML documents in place.

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
