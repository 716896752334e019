mod auth;
mod cli;
mod config;
mod dataset;
mod defects4j;
mod error;
mod output;
mod pipeline;
mod process;
mod sonar;
mod workspace;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting revharvest - revision metrics collector");
    cli.execute().await?;

    Ok(())
}
