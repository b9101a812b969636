use anyhow::Result;

use crate::cli::{Cli, ConfigCommand};
use crate::commands::resolve_config;
use crate::config::Config;

pub async fn run(cli: &Cli, cmd: &ConfigCommand) -> Result<()> {
	match cmd {
		ConfigCommand::Show => {
			let config = resolve_config(cli)?;
			println!("File:         {}", Config::path()?.display());
			println!("Node:         {}", config.network.node_url);
			println!("Faucet:       {}", config.network.faucet_url);
			println!(
				"Indexer:      {}",
				config.network.indexer_url.as_deref().unwrap_or("(none)")
			);
			println!(
				"Signer:       {}",
				if config.signer.private_key.is_some() { "configured" } else { "(none)" }
			);
			println!("Timeout:      {}s", config.confirmation.timeout_secs);
			println!("Poll:         {}ms", config.confirmation.poll_interval_ms);
			Ok(())
		}
		ConfigCommand::Init => {
			let path = Config::path()?;
			if path.exists() {
				println!("Config already exists: {}", path.display());
				return Ok(());
			}
			let path = Config::default().save()?;
			println!("Wrote {}", path.display());
			Ok(())
		}
	}
}
