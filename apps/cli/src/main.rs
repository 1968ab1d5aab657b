//! sitepipe CLI: build a bilingual static site from CMS content.
//!
//! Fetches entries from Contentful (or exported JSON), reconciles them per
//! locale, and writes JSON indices, detail pages and a merged sitemap.

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
