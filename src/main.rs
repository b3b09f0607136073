mod cli;

use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use tfstate_resource::{CheckRequest, InRequest, open_storage, run_check, run_in};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.timeout);
    let input = cli::read_request(cli.request.as_deref())?;
    let command = cli
        .into_command()
        .ok_or_else(|| eyre!("expected a destination directory or a subcommand"))?;

    match command {
        Command::In(args) => {
            let request = InRequest::from_json(&input)?;
            let storage = open_storage(&request.source.storage, timeout)?;
            let response = run_in(storage.as_ref(), &request, &args.destination).await?;
            println!("{}", serde_json::to_string(&response)?);
        }
        Command::Check => {
            let request = CheckRequest::from_json(&input)?;
            let storage = open_storage(&request.source.storage, timeout)?;
            let versions = run_check(storage.as_ref(), request.version.as_ref()).await?;
            tracing::info!(count = versions.len(), "check complete");
            println!("{}", serde_json::to_string(&versions)?);
        }
    }

    Ok(())
}
