pub mod account;
pub mod balance;
pub mod config;
pub mod fund;
pub mod run;
pub mod sync;
pub mod tx;

use std::sync::Arc;

use anyhow::Result;
use secrecy::ExposeSecret;

use crate::account::Account;
use crate::cli::Cli;
use crate::client::faucet::FaucetClient;
use crate::client::indexer::IndexerClient;
use crate::client::rest::RestClient;
use crate::config::{Config, Overrides};
use crate::submission::ConfirmOptions;
use crate::workflow::Orchestrator;

/// Load the config file, layer CLI flags and their environment variables
/// on top, and validate the result.
pub fn resolve_config(cli: &Cli) -> Result<Config> {
	let config = Config::load()?.apply(Overrides {
		node_url: cli.node_url.clone(),
		faucet_url: cli.faucet_url.clone(),
		indexer_url: cli.indexer_url.clone(),
		private_key: cli.private_key.clone(),
		timeout_secs: cli.timeout,
	});
	config.validate()?;
	Ok(config)
}

/// Restore the signing account from configured key material.
pub fn resolve_signer(config: &Config) -> Result<Account> {
	let key = config.signer.private_key.as_ref().ok_or_else(|| {
		anyhow::anyhow!("No private key configured. Set CHAINFLOW_PRIVATE_KEY or pass --private-key")
	})?;
	Ok(Account::from_private_key_hex(key.expose_secret())?)
}

/// Network clients built from one validated config.
pub struct Services {
	pub ledger: Arc<RestClient>,
	pub faucet: Arc<FaucetClient>,
	pub indexer: Option<Arc<IndexerClient>>,
	pub confirm: ConfirmOptions,
}

impl Services {
	pub fn connect(config: &Config) -> Result<Self> {
		let indexer = match &config.network.indexer_url {
			Some(url) => Some(Arc::new(IndexerClient::new(url)?)),
			None => None,
		};
		Ok(Self {
			ledger: Arc::new(RestClient::new(&config.network.node_url)?),
			faucet: Arc::new(FaucetClient::new(&config.network.faucet_url)?),
			indexer,
			confirm: config.confirm_options(),
		})
	}

	pub fn orchestrator(&self) -> Orchestrator {
		let orchestrator = Orchestrator::new(self.ledger.clone(), self.confirm)
			.with_faucet(self.faucet.clone());
		match &self.indexer {
			Some(indexer) => orchestrator.with_indexer(indexer.clone()),
			None => orchestrator,
		}
	}
}
