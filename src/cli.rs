use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
	name = "chainflow",
	about = "Run funded, verified transaction workflows against a Move ledger.",
	version
)]
pub struct Cli {
	/// Full node REST endpoint.
	#[arg(long, env = "CHAINFLOW_NODE_URL", global = true)]
	pub node_url: Option<String>,

	/// Faucet endpoint.
	#[arg(long, env = "CHAINFLOW_FAUCET_URL", global = true)]
	pub faucet_url: Option<String>,

	/// Indexer GraphQL endpoint.
	#[arg(long, env = "CHAINFLOW_INDEXER_URL", global = true)]
	pub indexer_url: Option<String>,

	/// Hex private key of the publishing account.
	#[arg(long, env = "CHAINFLOW_PRIVATE_KEY", hide_env_values = true, global = true)]
	pub private_key: Option<String>,

	/// Seconds to wait for each transaction to commit.
	#[arg(long, global = true)]
	pub timeout: Option<u64>,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
	/// Inspect the configured signing account.
	Account {
		#[command(subcommand)]
		command: AccountCommand,
	},

	/// Request coins from the faucet and wait for them to land.
	Fund {
		/// Account address (0x-prefixed).
		address: String,

		/// Amount in base units.
		#[arg(long, default_value_t = 100_000_000)]
		amount: u64,
	},

	/// Read a balance.
	Balance {
		/// Account address (0x-prefixed).
		address: String,

		/// Coin type; defaults to the native coin.
		#[arg(long, conflicts_with = "fa")]
		coin: Option<String>,

		/// Fungible-asset metadata object address.
		#[arg(long)]
		fa: Option<String>,
	},

	/// Check transaction status on-chain.
	Tx {
		#[command(subcommand)]
		command: TxCommand,
	},

	/// Compare the indexer's chain id with the node's.
	SyncCheck,

	/// Run one of the built-in workflows.
	Run {
		#[command(subcommand)]
		workflow: WorkflowCommand,
	},

	/// Show or write the config file.
	Config {
		#[command(subcommand)]
		command: ConfigCommand,
	},
}

// -- Account subcommands --

#[derive(Subcommand)]
pub enum AccountCommand {
	/// Generate a fresh key pair and print it. Nothing is written to disk.
	New,

	/// Print the address and public key of the configured private key.
	Show,
}

// -- Tx subcommands --

#[derive(Subcommand)]
pub enum TxCommand {
	/// Check confirmation status of a transaction.
	Status {
		/// Transaction hash (0x-prefixed).
		hash: String,
	},
}

// -- Workflow subcommands --

#[derive(Subcommand)]
pub enum WorkflowCommand {
	/// Fund two fresh accounts and transfer between them.
	Transfer {
		#[arg(long, default_value_t = 35)]
		amount: u64,
	},

	/// Publish MoonCoin, register, mint and transfer it.
	MoonCoin {
		/// Move package directory containing `build/`.
		package_dir: PathBuf,

		/// Package name under `build/`.
		#[arg(long, default_value = "Tutorial")]
		package: String,

		/// Module to publish.
		#[arg(long, default_value = "moon_coin")]
		module: String,
	},

	/// Create a collection and token, and pass it between two accounts.
	Nft,

	/// Mint, transfer, freeze, unfreeze and burn a published FA coin.
	FaCoin {
		/// Account that receives, gets frozen, and has coins burned.
		/// A fresh account is generated when omitted.
		#[arg(long)]
		holder: Option<String>,
	},
}

// -- Config subcommands --

#[derive(Subcommand)]
pub enum ConfigCommand {
	/// Print the effective configuration (without key material).
	Show,

	/// Write the default configuration file if none exists.
	Init,
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::CommandFactory;

	#[test]
	fn cli_definition_is_consistent() {
		Cli::command().debug_assert();
	}

	#[test]
	fn parses_workflow_with_defaults() {
		let cli = Cli::try_parse_from(["chainflow", "run", "transfer"]).unwrap();
		match cli.command {
			Command::Run {
				workflow: WorkflowCommand::Transfer { amount },
			} => assert_eq!(amount, 35),
			_ => panic!("wrong command"),
		}
	}

	#[test]
	fn coin_and_fa_conflict() {
		let r = Cli::try_parse_from(["chainflow", "balance", "0x1", "--coin", "a", "--fa", "0x2"]);
		assert!(r.is_err());
	}
}
