use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use chainflow::cli::{Cli, Command};
use chainflow::commands;

#[tokio::main]
async fn main() -> Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.with_writer(std::io::stderr)
		.init();

	let cli = Cli::parse();

	match &cli.command {
		Command::Account { command } => commands::account::run(&cli, command).await,
		Command::Fund { address, amount } => commands::fund::run(&cli, address, *amount).await,
		Command::Balance { address, coin, fa } => {
			commands::balance::run(&cli, address, coin.as_deref(), fa.as_deref()).await
		}
		Command::Tx { command } => commands::tx::run(&cli, command).await,
		Command::SyncCheck => commands::sync::run(&cli).await,
		Command::Run { workflow } => commands::run::run(&cli, workflow).await,
		Command::Config { command } => commands::config::run(&cli, command).await,
	}
}
