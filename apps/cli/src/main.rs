//! orbitscrape CLI — satellite catalog crawler.
//!
//! Fetches catalog detail pages for a range of NORAD ids and stores
//! descriptions, category memberships and images in a directory store.

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
