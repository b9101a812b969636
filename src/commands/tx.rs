use anyhow::Result;

use crate::cli::{Cli, TxCommand};
use crate::client::{LedgerClient, TxHash, TxStatus};
use crate::commands::{resolve_config, Services};

pub async fn run(cli: &Cli, cmd: &TxCommand) -> Result<()> {
	let config = resolve_config(cli)?;
	let services = Services::connect(&config)?;

	match cmd {
		TxCommand::Status { hash } => {
			let hash = TxHash(hash.clone());
			match services.ledger.transaction_status(&hash).await? {
				TxStatus::NotFound => println!("Transaction not found: {hash}"),
				TxStatus::Pending => {
					println!("Transaction: {hash}");
					println!("Status:      pending");
				}
				TxStatus::Committed { success, vm_status, fee } => {
					println!("Transaction: {hash}");
					println!("Status:      {}", if success { "committed" } else { "failed" });
					println!("VM status:   {vm_status}");
					println!("Fee:         {fee}");
				}
			}
			Ok(())
		}
	}
}
