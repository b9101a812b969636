use anyhow::Result;

use crate::cli::Cli;
use crate::commands::{resolve_config, Services};
use crate::crypto::AccountAddress;
use crate::provisioning;
use crate::state::{self, Asset};

pub async fn run(cli: &Cli, address: &str, amount: u64) -> Result<()> {
	let address: AccountAddress = address.parse()?;
	let config = resolve_config(cli)?;
	let services = Services::connect(&config)?;

	let result = provisioning::fund(
		services.faucet.as_ref(),
		services.ledger.as_ref(),
		address,
		amount,
		&services.confirm,
	)
	.await?;
	let balance = state::read_balance(services.ledger.as_ref(), address, &Asset::native()).await?;

	println!("Funded:  {address}");
	println!("Tx:      {}", result.hash);
	println!("Balance: {balance}");
	Ok(())
}
