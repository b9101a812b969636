use anyhow::{bail, Result};

use crate::cli::Cli;
use crate::client::{Indexer, LedgerClient};
use crate::commands::{resolve_config, Services};

/// Report whether indexer-backed verification would be trusted.
pub async fn run(cli: &Cli) -> Result<()> {
	let config = resolve_config(cli)?;
	let services = Services::connect(&config)?;
	let Some(indexer) = &services.indexer else {
		bail!("No indexer configured. Set CHAINFLOW_INDEXER_URL or network.indexer_url");
	};

	let node = services.ledger.chain_id().await?;
	let indexed = indexer.chain_id().await?;
	println!("Node chain id:    {node}");
	println!("Indexer chain id: {indexed}");
	if node == indexed {
		println!("In sync.");
	} else {
		println!("Out of sync; indexer steps will be skipped.");
	}
	Ok(())
}
