mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Profiles(args) => commands::profiles::execute(args, &cli.global).await,
        Commands::Plan(args) => commands::plan::execute(args, &cli.global).await,
        Commands::Version(args) => commands::version::execute(args, &cli.global).await,
        Commands::Create(args) => commands::create::execute(args, &cli.global).await,
        Commands::Destroy(args) => commands::destroy::execute(args, &cli.global).await,
        Commands::ClusterId(args) => commands::cluster_id::execute(args, &cli.global).await,
    }
}
