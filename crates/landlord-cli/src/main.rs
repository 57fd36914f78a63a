mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Demo { tenant_name, config } => commands::demo(tenant_name, config).await,
        Command::ValidateSpec { path } => commands::validate_spec(path).await,
        Command::ConfigShow => commands::config_show(),
    }
}
