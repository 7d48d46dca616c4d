use anyhow::Result;
use clap::Parser;
use exptrak::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    exptrak::telemetry::init(cli.verbose);
    cli.run().await
}
